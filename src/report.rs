//! CSV report of registered people.

use chrono::FixedOffset;

use crate::clock::short_date;
use crate::database::models::Person;
use crate::types::Gender;

pub const REPORT_FILE_NAME: &str = "ekklesia_report.csv";

const HEADER: [&str; 8] = ["Name", "Age", "Type", "Gender", "Church", "WhatsApp", "Source", "Registered"];

fn type_label(person: &Person) -> String {
    serde_json::to_value(person.person_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// One row per person; commas are stripped from names so spreadsheet imports stay aligned
pub fn people_csv(people: &[Person], offset: FixedOffset) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for person in people {
        writer.write_record([
            person.name.replace(',', ""),
            person.age.map(|a| a.to_string()).unwrap_or_default(),
            type_label(person),
            match person.gender {
                Some(Gender::Male) => "M".to_string(),
                Some(Gender::Female) => "F".to_string(),
                None => String::new(),
            },
            person.church.clone().unwrap_or_default(),
            person.phone.clone().unwrap_or_default(),
            person.marketing_source.clone().unwrap_or_default(),
            short_date(person.created_at, offset),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
