use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// Task metadata carried by an email
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageMetadata {
    pub location: Option<String>,
    pub job_number: Option<String>,
}

// "Location: Site A", "location - Warehouse 3"
static LOCATION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\blocation\s*[:\-]\s*([^\r\n,;|]+)").unwrap());

// "Job #1234", "Job No. 1234", "job number: 1234"
static JOB_NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bjob\s*(?:#|no\.?|num\.?|number)?\s*[:#]?\s*(\d{2,})").unwrap()
});

/// Extract location and job number from the subject, then the body, then
/// the folder path (`.../<location>/<job number>`).
pub fn extract_metadata(subject: &str, body: &str, folder_path: &[String]) -> MessageMetadata {
    let location = find_location(subject)
        .or_else(|| find_location(body))
        .or_else(|| location_from_folder(folder_path));

    let job_number = find_job_number(subject)
        .or_else(|| find_job_number(body))
        .or_else(|| job_number_from_folder(folder_path));

    debug!("Extracted metadata: location={:?}, job={:?}", location, job_number);

    MessageMetadata { location, job_number }
}

fn find_location(text: &str) -> Option<String> {
    LOCATION_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().trim_matches('*').trim().to_string())
        .filter(|s| !s.is_empty())
}

fn find_job_number(text: &str) -> Option<String> {
    JOB_NUMBER_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn location_from_folder(folder_path: &[String]) -> Option<String> {
    if folder_path.len() < 2 {
        return None;
    }
    folder_path
        .get(folder_path.len() - 2)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn job_number_from_folder(folder_path: &[String]) -> Option<String> {
    folder_path
        .last()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}
