/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// How a person relates to the church hosting the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "person_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonType {
    Member,
    Visitor,
    Leader,
    Pastor,
    Staff,
}

impl PersonType {
    /// Everyone already part of the church counts on the member side of the dashboard
    pub fn is_member(self) -> bool {
        !matches!(self, PersonType::Visitor)
    }
}

impl Default for PersonType {
    fn default() -> Self {
        PersonType::Visitor
    }
}

/// Only STAFF people may log in to the back office
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "person_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Staff,
    Participant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "checkpoint_category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckpointCategory {
    General,
    Kids,
    Prayer,
    Prophetic,
    Evangelism,
    Consolidation,
    Store,
}

impl CheckpointCategory {
    /// Service points people are expected to visit several times a day
    pub fn allows_reentry(self) -> bool {
        matches!(
            self,
            CheckpointCategory::Prophetic
                | CheckpointCategory::Prayer
                | CheckpointCategory::Evangelism
                | CheckpointCategory::Consolidation
                | CheckpointCategory::Store
        )
    }

    /// Checkpoint that receives the automatic movement of a quick registration
    pub fn for_department(department: &str) -> Self {
        match department.trim().to_ascii_uppercase().as_str() {
            "KIDS" => CheckpointCategory::Kids,
            "CONSOLIDATION" => CheckpointCategory::Consolidation,
            _ => CheckpointCategory::General,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "gender")]
pub enum Gender {
    #[serde(rename = "M")]
    #[sqlx(rename = "M")]
    Male,
    #[serde(rename = "F")]
    #[sqlx(rename = "F")]
    Female,
}

impl Gender {
    /// Free-form input ("M", "Masculino", "f") to a gender; blank input is none
    pub fn parse_loose(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if input.to_ascii_uppercase().starts_with('M') {
            Some(Gender::Male)
        } else {
            Some(Gender::Female)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "age_group", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgeGroup {
    Crianca,
    Jovem,
    Adulto,
}

impl AgeGroup {
    /// Accepts the enum names in any case, with or without the cedilla
    pub fn parse_loose(input: &str) -> Option<Self> {
        let normalized: String = input
            .trim()
            .to_uppercase()
            .chars()
            .map(|c| if c == 'Ç' { 'C' } else { c })
            .collect();
        match normalized.as_str() {
            "CRIANCA" => Some(AgeGroup::Crianca),
            "JOVEM" => Some(AgeGroup::Jovem),
            "ADULTO" => Some(AgeGroup::Adulto),
            _ => None,
        }
    }

    pub fn from_age(age: i32) -> Self {
        if age < 12 {
            AgeGroup::Crianca
        } else if age < 18 {
            AgeGroup::Jovem
        } else {
            AgeGroup::Adulto
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "sale_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Pending,
    Paid,
    Delivered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Delivered,
}

/// Meeting lifecycle: scheduled, then held once its date has passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "meeting_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeetingType {
    Agendada,
    Realizada,
}

impl Default for MeetingType {
    fn default() -> Self {
        MeetingType::Agendada
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_parsing_follows_first_letter() {
        assert_eq!(Gender::parse_loose("M"), Some(Gender::Male));
        assert_eq!(Gender::parse_loose("masculino"), Some(Gender::Male));
        assert_eq!(Gender::parse_loose("Feminino"), Some(Gender::Female));
        assert_eq!(Gender::parse_loose("x"), Some(Gender::Female));
        assert_eq!(Gender::parse_loose("  "), None);
    }

    #[test]
    fn age_groups() {
        assert_eq!(AgeGroup::parse_loose("Criança"), Some(AgeGroup::Crianca));
        assert_eq!(AgeGroup::parse_loose("jovem"), Some(AgeGroup::Jovem));
        assert_eq!(AgeGroup::parse_loose("ADULTO"), Some(AgeGroup::Adulto));
        assert_eq!(AgeGroup::parse_loose("idoso"), None);
        assert_eq!(AgeGroup::from_age(5), AgeGroup::Crianca);
        assert_eq!(AgeGroup::from_age(12), AgeGroup::Jovem);
        assert_eq!(AgeGroup::from_age(17), AgeGroup::Jovem);
        assert_eq!(AgeGroup::from_age(18), AgeGroup::Adulto);
    }

    #[test]
    fn reentry_only_for_service_points() {
        assert!(CheckpointCategory::Prayer.allows_reentry());
        assert!(CheckpointCategory::Store.allows_reentry());
        assert!(!CheckpointCategory::General.allows_reentry());
        assert!(!CheckpointCategory::Kids.allows_reentry());
    }

    #[test]
    fn department_maps_to_checkpoint_category() {
        assert_eq!(CheckpointCategory::for_department("KIDS"), CheckpointCategory::Kids);
        assert_eq!(CheckpointCategory::for_department("consolidation"), CheckpointCategory::Consolidation);
        assert_eq!(CheckpointCategory::for_department("ALTAR"), CheckpointCategory::General);
    }

    #[test]
    fn enums_use_upper_case_wire_names() {
        assert_eq!(serde_json::to_value(PersonType::Visitor).unwrap(), "VISITOR");
        assert_eq!(serde_json::to_value(Gender::Female).unwrap(), "F");
        assert_eq!(serde_json::to_value(MeetingType::Realizada).unwrap(), "REALIZADA");
        let parsed: PersonType = serde_json::from_value(serde_json::json!("PASTOR")).unwrap();
        assert!(parsed.is_member());
        assert!(!PersonType::Visitor.is_member());
    }
}
