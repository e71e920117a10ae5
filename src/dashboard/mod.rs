//! Dashboard aggregation.
//!
//! Manual headcounts and QR movements are unified into [`Entry`] values and
//! reduced into per-day, per-checkpoint counters plus global breakdowns. The
//! reduction is pure: loading the inputs is `DashboardService`'s job.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::clock::{day_key, hour_key};
use crate::types::{AgeGroup, Gender, PersonType};

/// Bucket every entry of a day also lands in
pub const TOTAL_BUCKET: &str = "Total";
/// Bucket for entries whose checkpoint is gone
pub const UNKNOWN_BUCKET: &str = "Unknown";

const SOCIAL_SOURCES: [&str; 4] = ["Instagram", "WhatsApp", "Youtube / Tiktok", "Google / Site"];
const CHURCH_SOURCES: [&str; 1] = ["Pastor / Líder"];
const TOP_CHURCHES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    Manual,
    Scanner,
}

/// One counted presence, from either a manual headcount or a scan
#[derive(Debug, Clone)]
pub struct Entry {
    pub at: DateTime<Utc>,
    pub source: EntrySource,
    pub checkpoint: Option<String>,
    pub quantity: i64,
    pub person_type: Option<PersonType>,
    pub gender: Option<Gender>,
    pub age_group: Option<AgeGroup>,
    pub church: Option<String>,
    pub marketing_source: Option<String>,
    pub is_salvation: bool,
    pub is_healing: bool,
    pub is_deliverance: bool,
}

/// Manual headcount row joined with its checkpoint name
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ManualRecord {
    pub recorded_at: DateTime<Utc>,
    pub checkpoint_name: Option<String>,
    #[sqlx(rename = "type")]
    pub person_type: PersonType,
    pub church: Option<String>,
    pub age_group: Option<AgeGroup>,
    pub gender: Option<Gender>,
    pub quantity: i32,
    pub marketing_source: Option<String>,
    pub is_salvation: bool,
    pub is_healing: bool,
    pub is_deliverance: bool,
}

/// Movement row joined with its checkpoint name and the scanned person
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScanRecord {
    pub recorded_at: DateTime<Utc>,
    pub checkpoint_name: Option<String>,
    pub person_type: PersonType,
    pub gender: Option<Gender>,
    pub age: Option<i32>,
    pub church: Option<String>,
    pub marketing_source: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SaleRecord {
    pub id: Uuid,
    pub buyer_type: Option<PersonType>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SoldItem {
    pub sale_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub category: Option<String>,
}

/// Everything the dashboard reduces over
#[derive(Debug, Clone, Default)]
pub struct DashboardInputs {
    pub manual: Vec<ManualRecord>,
    pub scans: Vec<ScanRecord>,
    pub sales: Vec<SaleRecord>,
    pub sold_items: Vec<SoldItem>,
    pub meetings_scheduled: i64,
    pub meetings_held: i64,
    pub consolidation_count: i64,
}

impl From<ManualRecord> for Entry {
    fn from(r: ManualRecord) -> Self {
        Entry {
            at: r.recorded_at,
            source: EntrySource::Manual,
            checkpoint: r.checkpoint_name,
            quantity: i64::from(r.quantity),
            person_type: Some(r.person_type),
            gender: r.gender,
            age_group: r.age_group,
            church: r.church,
            marketing_source: r.marketing_source,
            is_salvation: r.is_salvation,
            is_healing: r.is_healing,
            is_deliverance: r.is_deliverance,
        }
    }
}

impl From<ScanRecord> for Entry {
    fn from(r: ScanRecord) -> Self {
        Entry {
            at: r.recorded_at,
            source: EntrySource::Scanner,
            checkpoint: r.checkpoint_name,
            quantity: 1,
            person_type: Some(r.person_type),
            gender: r.gender,
            age_group: r.age.map(AgeGroup::from_age),
            church: r.church,
            marketing_source: r.marketing_source,
            is_salvation: false,
            is_healing: false,
            is_deliverance: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    #[serde(rename = "VISITOR")]
    pub visitor: i64,
    #[serde(rename = "MEMBER")]
    pub member: i64,
}

impl TypeCounts {
    fn add(&mut self, person_type: Option<PersonType>, n: i64) {
        if person_type.is_some_and(PersonType::is_member) {
            self.member += n;
        } else {
            self.visitor += n;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenderCounts {
    #[serde(rename = "M")]
    pub male: i64,
    #[serde(rename = "F")]
    pub female: i64,
}

impl GenderCounts {
    fn add(&mut self, gender: Option<Gender>, n: i64) {
        match gender {
            Some(Gender::Male) => self.male += n,
            Some(Gender::Female) => self.female += n,
            None => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgeCounts {
    #[serde(rename = "CRIANCA")]
    pub crianca: i64,
    #[serde(rename = "JOVEM")]
    pub jovem: i64,
    #[serde(rename = "ADULTO")]
    pub adulto: i64,
}

impl AgeCounts {
    fn add(&mut self, age_group: Option<AgeGroup>, n: i64) {
        match age_group {
            Some(AgeGroup::Crianca) => self.crianca += n,
            Some(AgeGroup::Jovem) => self.jovem += n,
            Some(AgeGroup::Adulto) => self.adulto += n,
            None => {}
        }
    }
}

/// Salvation, healing or deliverance tally
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub total: i64,
    #[serde(rename = "M")]
    pub male: i64,
    #[serde(rename = "F")]
    pub female: i64,
    #[serde(rename = "VISITOR")]
    pub visitor: i64,
    #[serde(rename = "MEMBER")]
    pub member: i64,
}

impl OutcomeCounts {
    fn add(&mut self, entry: &Entry) {
        let n = entry.quantity;
        self.total += n;
        match entry.gender {
            Some(Gender::Male) => self.male += n,
            Some(Gender::Female) => self.female += n,
            None => {}
        }
        if entry.person_type.is_some_and(PersonType::is_member) {
            self.member += n;
        } else {
            self.visitor += n;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckpointStats {
    pub total: i64,
    #[serde(rename = "type")]
    pub by_type: TypeCounts,
    pub gender: GenderCounts,
    pub age: AgeCounts,
    pub marketing: BTreeMap<String, i64>,
    pub church: BTreeMap<String, i64>,
    pub accepted: i64,
    pub reconciled: i64,
    pub salvation: OutcomeCounts,
    pub healing: OutcomeCounts,
    pub deliverance: OutcomeCounts,
}

impl CheckpointStats {
    fn add(&mut self, entry: &Entry) {
        let n = entry.quantity;
        self.total += n;
        self.by_type.add(entry.person_type, n);
        self.gender.add(entry.gender, n);
        self.age.add(entry.age_group, n);
        if let Some(source) = non_blank(&entry.marketing_source) {
            *self.marketing.entry(source.to_string()).or_default() += n;
            match decision_of(source).as_deref() {
                Some("ACEITOU") => self.accepted += n,
                Some("RECONCILIACAO") => self.reconciled += n,
                _ => {}
            }
        }
        if let Some(church) = non_blank(&entry.church) {
            *self.church.entry(church.to_string()).or_default() += n;
        }
        if entry.is_salvation {
            self.salvation.add(entry);
        }
        if entry.is_healing {
            self.healing.add(entry);
        }
        if entry.is_deliverance {
            self.deliverance.add(entry);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedValue {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryRevenue {
    #[serde(rename = "LOJA", with = "rust_decimal::serde::float")]
    pub loja: Decimal,
    #[serde(rename = "CANTINA", with = "rust_decimal::serde::float")]
    pub cantina: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuyerCounts {
    #[serde(rename = "MEMBER")]
    pub member: i64,
    #[serde(rename = "VISITOR")]
    pub visitor: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesStats {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    pub by_category: CategoryRevenue,
    pub demographics: BuyerCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MeetingStats {
    pub realizadas: i64,
    pub agendadas: i64,
}

/// Dashboard payload
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub sales_stats: SalesStats,
    pub meeting_stats: MeetingStats,
    pub checkpoints_data: BTreeMap<String, BTreeMap<String, CheckpointStats>>,
    pub timeline: BTreeMap<String, BTreeMap<String, i64>>,
    pub manual_count: i64,
    pub scanner_count: i64,
    pub consolidation_count: i64,
    pub total: i64,
    pub by_type: TypeCounts,
    pub by_gender: GenderCounts,
    pub by_age: AgeCounts,
    pub by_church: Vec<NamedValue>,
    pub by_source: Vec<NamedValue>,
    pub available_days: Vec<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// `ACEITOU` from either `ACEITOU` or a consolidation card's `Decisão: ACEITOU`
fn decision_of(source: &str) -> Option<String> {
    let tag = source
        .strip_prefix("Decisão:")
        .unwrap_or(source)
        .trim()
        .to_uppercase();
    (!tag.is_empty()).then_some(tag)
}

/// Marketing channel shown on the source chart
pub fn source_group(source: &str) -> &str {
    if SOCIAL_SOURCES.contains(&source) {
        "Redes Sociais"
    } else if CHURCH_SOURCES.contains(&source) {
        "Igreja / Culto"
    } else {
        source
    }
}

/// Sales chart bucket of a product category
pub fn is_food(category: Option<&str>) -> bool {
    matches!(
        category.map(|c| c.trim().to_uppercase()).as_deref(),
        Some("CANTINA") | Some("FOOD")
    )
}

/// `dd/MM` keys in calendar order
fn calendar_order(days: impl Iterator<Item = String>) -> Vec<String> {
    let mut days: Vec<String> = days.collect();
    days.sort_by_key(|d| {
        let mut parts = d.split('/').map(|p| p.parse::<u32>().unwrap_or(0));
        let day = parts.next().unwrap_or(0);
        let month = parts.next().unwrap_or(0);
        (month, day)
    });
    days
}

fn ranked(map: HashMap<String, i64>, limit: Option<usize>) -> Vec<NamedValue> {
    let mut values: Vec<NamedValue> = map
        .into_iter()
        .map(|(name, value)| NamedValue { name, value })
        .collect();
    values.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    if let Some(limit) = limit {
        values.truncate(limit);
    }
    values
}

/// Reduce the loaded records into the dashboard payload, bucketing by the venue clock
pub fn aggregate(inputs: DashboardInputs, offset: FixedOffset) -> DashboardReport {
    let mut report = DashboardReport {
        consolidation_count: inputs.consolidation_count,
        meeting_stats: MeetingStats {
            realizadas: inputs.meetings_held,
            agendadas: inputs.meetings_scheduled,
        },
        ..Default::default()
    };

    let entries = inputs
        .manual
        .into_iter()
        .map(Entry::from)
        .chain(inputs.scans.into_iter().map(Entry::from));

    let mut churches: HashMap<String, i64> = HashMap::new();
    let mut sources: HashMap<String, i64> = HashMap::new();

    for entry in entries {
        let n = entry.quantity;
        let day = day_key(entry.at, offset);
        let hour = hour_key(entry.at, offset);

        *report
            .timeline
            .entry(day.clone())
            .or_default()
            .entry(hour)
            .or_default() += n;

        let buckets = report.checkpoints_data.entry(day).or_default();
        buckets.entry(TOTAL_BUCKET.to_string()).or_default().add(&entry);
        let name = entry
            .checkpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_BUCKET);
        if name != TOTAL_BUCKET {
            buckets.entry(name.to_string()).or_default().add(&entry);
        }

        match entry.source {
            EntrySource::Manual => report.manual_count += n,
            EntrySource::Scanner => report.scanner_count += n,
        }
        report.total += n;
        report.by_type.add(entry.person_type, n);
        report.by_gender.add(entry.gender, n);
        report.by_age.add(entry.age_group, n);

        if let Some(church) = non_blank(&entry.church) {
            *churches.entry(church.to_string()).or_default() += n;
        }
        if let Some(source) = non_blank(&entry.marketing_source) {
            *sources.entry(source_group(source).to_string()).or_default() += n;
        }
    }

    report.by_church = ranked(churches, Some(TOP_CHURCHES));
    report.by_source = ranked(sources, None);
    report.available_days = calendar_order(report.checkpoints_data.keys().cloned());

    for item in &inputs.sold_items {
        let amount = item.price * Decimal::from(item.quantity);
        report.sales_stats.total_revenue += amount;
        if is_food(item.category.as_deref()) {
            report.sales_stats.by_category.cantina += amount;
        } else {
            report.sales_stats.by_category.loja += amount;
        }
    }
    for sale in &inputs.sales {
        if sale.buyer_type == Some(PersonType::Member) {
            report.sales_stats.demographics.member += 1;
        } else {
            report.sales_stats.demographics.visitor += 1;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn brt() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, d, h, m, 0).unwrap()
    }

    fn manual(at: DateTime<Utc>, checkpoint: &str, quantity: i32) -> ManualRecord {
        ManualRecord {
            recorded_at: at,
            checkpoint_name: Some(checkpoint.to_string()),
            person_type: PersonType::Visitor,
            church: Some("Ibmg Sede".into()),
            age_group: None,
            gender: None,
            quantity,
            marketing_source: None,
            is_salvation: false,
            is_healing: false,
            is_deliverance: false,
        }
    }

    fn scan(at: DateTime<Utc>, checkpoint: Option<&str>, age: Option<i32>) -> ScanRecord {
        ScanRecord {
            recorded_at: at,
            checkpoint_name: checkpoint.map(str::to_string),
            person_type: PersonType::Leader,
            gender: Some(Gender::Female),
            age,
            church: Some("Ibmg Orlando".into()),
            marketing_source: Some("Instagram".into()),
        }
    }

    #[test]
    fn empty_inputs_give_an_empty_report() {
        let report = aggregate(DashboardInputs::default(), brt());
        assert_eq!(report.total, 0);
        assert!(report.checkpoints_data.is_empty());
        assert!(report.available_days.is_empty());
        assert_eq!(report.sales_stats.total_revenue, Decimal::ZERO);
    }

    #[test]
    fn entries_bucket_by_venue_day_and_hour() {
        // 01:30 UTC on the 14th is 22:30 on the 13th in Brasilia
        let inputs = DashboardInputs {
            manual: vec![manual(utc(14, 1, 30), "Recepção", 3), manual(utc(14, 13, 0), "Recepção", 2)],
            ..Default::default()
        };
        let report = aggregate(inputs, brt());
        assert_eq!(report.timeline["13/02"]["22"], 3);
        assert_eq!(report.timeline["14/02"]["10"], 2);
        assert_eq!(report.checkpoints_data["13/02"]["Recepção"].total, 3);
        assert_eq!(report.checkpoints_data["13/02"][TOTAL_BUCKET].total, 3);
        assert_eq!(report.manual_count, 5);
        assert_eq!(report.scanner_count, 0);
        assert_eq!(report.available_days, vec!["13/02", "14/02"]);
    }

    #[test]
    fn scans_count_once_and_derive_age_group() {
        let inputs = DashboardInputs {
            scans: vec![
                scan(utc(13, 20, 0), Some("Kids"), Some(8)),
                scan(utc(13, 20, 5), Some("Kids"), Some(15)),
                scan(utc(13, 20, 9), None, None),
            ],
            ..Default::default()
        };
        let report = aggregate(inputs, brt());
        assert_eq!(report.scanner_count, 3);
        assert_eq!(report.total, 3);
        let kids = &report.checkpoints_data["13/02"]["Kids"];
        assert_eq!(kids.age.crianca, 1);
        assert_eq!(kids.age.jovem, 1);
        assert_eq!(kids.by_type.member, 2);
        assert_eq!(report.checkpoints_data["13/02"][UNKNOWN_BUCKET].total, 1);
        // unknown age is not bucketed
        assert_eq!(report.by_age.crianca + report.by_age.jovem + report.by_age.adulto, 2);
        assert_eq!(report.by_gender.female, 3);
        assert_eq!(report.by_source, vec![NamedValue { name: "Redes Sociais".into(), value: 3 }]);
    }

    #[test]
    fn outcomes_split_by_gender_and_type() {
        let mut saved = manual(utc(13, 22, 0), "Altar", 4);
        saved.is_salvation = true;
        saved.gender = Some(Gender::Male);
        saved.marketing_source = Some("ACEITOU".into());
        let mut healed = manual(utc(13, 22, 1), "Altar", 1);
        healed.is_healing = true;
        healed.person_type = PersonType::Member;
        healed.marketing_source = Some("Decisão: RECONCILIACAO".into());

        let report = aggregate(DashboardInputs { manual: vec![saved, healed], ..Default::default() }, brt());
        let altar = &report.checkpoints_data["13/02"]["Altar"];
        assert_eq!(altar.salvation, OutcomeCounts { total: 4, male: 4, female: 0, visitor: 4, member: 0 });
        assert_eq!(altar.healing, OutcomeCounts { total: 1, male: 0, female: 0, visitor: 0, member: 1 });
        assert_eq!(altar.deliverance, OutcomeCounts::default());
        assert_eq!(altar.accepted, 4);
        assert_eq!(altar.reconciled, 1);
        assert_eq!(altar.marketing["ACEITOU"], 4);
        assert_eq!(altar.church["Ibmg Sede"], 5);
        assert_eq!(report.checkpoints_data["13/02"][TOTAL_BUCKET], *altar);
    }

    #[test]
    fn churches_keep_top_five_descending() {
        let manual_entries = ["A", "B", "C", "D", "E", "F"]
            .iter()
            .enumerate()
            .map(|(i, church)| {
                let mut m = manual(utc(13, 20, 0), "Recepção", i as i32 + 1);
                m.church = Some(church.to_string());
                m
            })
            .collect();
        let report = aggregate(DashboardInputs { manual: manual_entries, ..Default::default() }, brt());
        let names: Vec<&str> = report.by_church.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["F", "E", "D", "C", "B"]);
        assert_eq!(report.by_church[0].value, 6);
    }

    #[test]
    fn marketing_sources_are_grouped() {
        assert_eq!(source_group("WhatsApp"), "Redes Sociais");
        assert_eq!(source_group("Google / Site"), "Redes Sociais");
        assert_eq!(source_group("Pastor / Líder"), "Igreja / Culto");
        assert_eq!(source_group("Faixa / Rua"), "Faixa / Rua");
    }

    #[test]
    fn days_sort_by_calendar_not_text() {
        let days = calendar_order(vec!["02/03".to_string(), "28/02".to_string(), "01/03".to_string()].into_iter());
        assert_eq!(days, vec!["28/02", "01/03", "02/03"]);
    }

    #[test]
    fn sales_split_revenue_by_category() {
        let sale_a = Uuid::new_v4();
        let sale_b = Uuid::new_v4();
        let inputs = DashboardInputs {
            sales: vec![
                SaleRecord { id: sale_a, buyer_type: Some(PersonType::Member) },
                SaleRecord { id: sale_b, buyer_type: None },
            ],
            sold_items: vec![
                SoldItem { sale_id: sale_a, quantity: 2, price: "30.00".parse().unwrap(), category: Some("LOJA".into()) },
                SoldItem { sale_id: sale_b, quantity: 3, price: "5.50".parse().unwrap(), category: Some("food".into()) },
                SoldItem { sale_id: sale_b, quantity: 1, price: "12.00".parse().unwrap(), category: None },
            ],
            meetings_scheduled: 2,
            meetings_held: 5,
            consolidation_count: 7,
            ..Default::default()
        };
        let report = aggregate(inputs, brt());
        assert_eq!(report.sales_stats.total_revenue, "88.50".parse::<Decimal>().unwrap());
        assert_eq!(report.sales_stats.by_category.cantina, "16.50".parse::<Decimal>().unwrap());
        assert_eq!(report.sales_stats.by_category.loja, "72.00".parse::<Decimal>().unwrap());
        assert_eq!(report.sales_stats.demographics, BuyerCounts { member: 1, visitor: 1 });
        assert_eq!(report.meeting_stats, MeetingStats { realizadas: 5, agendadas: 2 });
        assert_eq!(report.consolidation_count, 7);
    }

    #[test]
    fn report_serializes_with_wire_names() {
        let inputs = DashboardInputs {
            manual: vec![manual(utc(13, 20, 0), "Recepção", 1)],
            ..Default::default()
        };
        let value = serde_json::to_value(aggregate(inputs, brt())).unwrap();
        assert_eq!(value["salesStats"]["byCategory"]["LOJA"], 0.0);
        assert_eq!(value["checkpointsData"]["13/02"]["Total"]["type"]["VISITOR"], 1);
        assert_eq!(value["availableDays"][0], "13/02");
        assert_eq!(value["byChurch"][0]["name"], "Ibmg Sede");
    }
}
