//! Reconciles a freshly extracted clinical snapshot with the one stored for the user.
//!
//! The record with the later `report_date` wins; every null in it is then backfilled from
//! the older record. Lab results are backfilled field by field, so a newer entry that only
//! carries a unit still picks up the older value and flag.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::models::{ClinicalDataRecord, LabResultDetail, LabResults, PatientInfo, SymptomsHistory};

/// Fill gaps in `self` from an older counterpart without overwriting present values.
trait Backfill {
    fn backfill_from(&mut self, older: &Self);
}

impl<T: Clone> Backfill for Option<T> {
    fn backfill_from(&mut self, older: &Self) {
        if self.is_none() {
            self.clone_from(older);
        }
    }
}

impl Backfill for Vec<String> {
    fn backfill_from(&mut self, older: &Self) {
        if self.is_empty() {
            self.clone_from(older);
        }
    }
}

impl Backfill for LabResultDetail {
    fn backfill_from(&mut self, older: &Self) {
        self.value.backfill_from(&older.value);
        self.unit.backfill_from(&older.unit);
        self.status_flag.backfill_from(&older.status_flag);
    }
}

impl Backfill for PatientInfo {
    fn backfill_from(&mut self, older: &Self) {
        self.name.backfill_from(&older.name);
        self.age_years.backfill_from(&older.age_years);
        self.gender.backfill_from(&older.gender);
        self.report_date.backfill_from(&older.report_date);
    }
}

impl Backfill for LabResults {
    fn backfill_from(&mut self, older: &Self) {
        self.hba1c.backfill_from(&older.hba1c);
        self.fasting_plasma_glucose
            .backfill_from(&older.fasting_plasma_glucose);
        self.two_hr_ogtt_glucose
            .backfill_from(&older.two_hr_ogtt_glucose);
        self.random_plasma_glucose
            .backfill_from(&older.random_plasma_glucose);
        self.bmi.backfill_from(&older.bmi);
    }
}

impl Backfill for SymptomsHistory {
    fn backfill_from(&mut self, older: &Self) {
        self.polyuria.backfill_from(&older.polyuria);
        self.polydipsia.backfill_from(&older.polydipsia);
        self.polyphagia.backfill_from(&older.polyphagia);
        self.unexplained_weight_loss
            .backfill_from(&older.unexplained_weight_loss);
        self.fatigue.backfill_from(&older.fatigue);
        self.blurred_vision.backfill_from(&older.blurred_vision);
        self.slow_healing_sores_infections
            .backfill_from(&older.slow_healing_sores_infections);
        self.family_history_diabetes
            .backfill_from(&older.family_history_diabetes);
        self.ethnicity.backfill_from(&older.ethnicity);
        self.history_gestational_diabetes
            .backfill_from(&older.history_gestational_diabetes);
        self.history_prediabetes
            .backfill_from(&older.history_prediabetes);
        self.history_hypertension
            .backfill_from(&older.history_hypertension);
        self.history_dyslipidemia
            .backfill_from(&older.history_dyslipidemia);
        self.history_pcos.backfill_from(&older.history_pcos);
        self.current_medications_keywords
            .backfill_from(&older.current_medications_keywords);
        self.other_relevant_medical_history
            .backfill_from(&older.other_relevant_medical_history);
    }
}

impl Backfill for ClinicalDataRecord {
    fn backfill_from(&mut self, older: &Self) {
        self.patient_info.backfill_from(&older.patient_info);
        self.lab_results.backfill_from(&older.lab_results);
        self.symptoms_history.backfill_from(&older.symptoms_history);
    }
}

/// Parse a report date. Accepts RFC 3339 (a trailing `Z` is read as UTC), zoned or naive
/// date-times with or without seconds, and `YYYY-MM-DD` or `YYYYMMDD` dates; naive values
/// are taken as UTC.
pub fn parse_report_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let zoned = match raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        Some(stripped) => format!("{stripped}+00:00"),
        None => raw.to_string(),
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&zoned) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M%:z",
        "%Y-%m-%d %H:%M%:z",
    ] {
        if let Ok(parsed) = DateTime::parse_from_str(&zoned, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    ["%Y-%m-%d", "%Y%m%d"]
        .into_iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn report_date(record: &ClinicalDataRecord) -> Option<DateTime<Utc>> {
    record
        .patient_info
        .report_date
        .as_deref()
        .and_then(parse_report_date)
}

/// Merge the stored snapshot with the incoming one.
///
/// An empty side (absent, or a record with no data) yields the other side unchanged.
/// Otherwise the incoming record is preferred only when its date parses and is strictly
/// later than the stored one; ties and unparseable dates keep the stored record as the
/// base. Merging a record with itself returns it unchanged.
pub fn merge_clinical_data(
    existing: Option<&ClinicalDataRecord>,
    incoming: Option<&ClinicalDataRecord>,
) -> ClinicalDataRecord {
    let existing = existing.filter(|record| !record.is_empty());
    let incoming = incoming.filter(|record| !record.is_empty());

    let (existing, incoming) = match (existing, incoming) {
        (None, None) => return ClinicalDataRecord::default(),
        (Some(only), None) | (None, Some(only)) => return only.clone(),
        (Some(existing), Some(incoming)) => (existing, incoming),
    };

    let incoming_is_latest = match (report_date(incoming), report_date(existing)) {
        (Some(incoming_date), Some(existing_date)) => incoming_date > existing_date,
        (Some(_), None) => true,
        (None, _) => false,
    };

    let (latest, older) = if incoming_is_latest {
        (incoming, existing)
    } else {
        (existing, incoming)
    };

    let mut merged = latest.clone();
    merged.backfill_from(older);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatusFlag;

    fn lab(value: Option<f64>, unit: Option<&str>, flag: Option<StatusFlag>) -> LabResultDetail {
        LabResultDetail {
            value,
            unit: unit.map(str::to_string),
            status_flag: flag,
        }
    }

    fn dated(date: Option<&str>) -> ClinicalDataRecord {
        let mut record = ClinicalDataRecord::default();
        record.patient_info.report_date = date.map(str::to_string);
        record
    }

    #[test]
    fn newer_null_lab_borrows_older_values() {
        let mut existing = dated(Some("2024-01-01"));
        existing.lab_results.hba1c = lab(Some(5.7), Some("%"), Some(StatusFlag::Normal));
        let mut incoming = dated(Some("2024-06-01"));
        incoming.lab_results.hba1c = lab(None, None, None);

        let merged = merge_clinical_data(Some(&existing), Some(&incoming));

        let mut expected = incoming.clone();
        expected.lab_results.hba1c = lab(Some(5.7), Some("%"), Some(StatusFlag::Normal));
        assert_eq!(merged, expected);
    }

    #[test]
    fn lab_backfill_keeps_newer_unit_and_flag() {
        let mut existing = dated(Some("2024-01-01"));
        existing.lab_results.fasting_plasma_glucose =
            lab(Some(98.0), Some("mg/dL"), Some(StatusFlag::Normal));
        let mut incoming = dated(Some("2024-06-01"));
        incoming.lab_results.fasting_plasma_glucose =
            lab(None, Some("mmol/L"), Some(StatusFlag::High));

        let merged = merge_clinical_data(Some(&existing), Some(&incoming));

        assert_eq!(
            merged.lab_results.fasting_plasma_glucose,
            lab(Some(98.0), Some("mmol/L"), Some(StatusFlag::High))
        );
    }

    #[test]
    fn latest_values_win_over_older_ones() {
        let mut existing = dated(Some("2024-01-01"));
        existing.lab_results.hba1c = lab(Some(5.7), Some("%"), Some(StatusFlag::Normal));
        existing.symptoms_history.fatigue = Some(false);
        let mut incoming = dated(Some("2024-06-01"));
        incoming.lab_results.hba1c = lab(Some(6.9), Some("%"), Some(StatusFlag::High));
        incoming.symptoms_history.fatigue = Some(true);

        let merged = merge_clinical_data(Some(&existing), Some(&incoming));

        assert_eq!(merged.lab_results.hba1c.value, Some(6.9));
        assert_eq!(merged.symptoms_history.fatigue, Some(true));
        assert_eq!(merged.patient_info.report_date.as_deref(), Some("2024-06-01"));
    }

    #[test]
    fn older_incoming_record_only_fills_gaps() {
        let mut existing = dated(Some("2024-06-01"));
        existing.patient_info.name = Some("Stored Name".to_string());
        let mut incoming = dated(Some("2023-02-10"));
        incoming.patient_info.name = Some("Old Name".to_string());
        incoming.patient_info.age_years = Some(52);

        let merged = merge_clinical_data(Some(&existing), Some(&incoming));

        assert_eq!(merged.patient_info.name.as_deref(), Some("Stored Name"));
        assert_eq!(merged.patient_info.age_years, Some(52));
        assert_eq!(merged.patient_info.report_date.as_deref(), Some("2024-06-01"));
    }

    #[test]
    fn unparseable_date_never_beats_a_parseable_one() {
        let mut existing = dated(Some("2024-01-01"));
        existing.patient_info.gender = Some("female".to_string());
        let mut incoming = dated(Some("sometime last spring"));
        incoming.patient_info.gender = Some("male".to_string());

        let merged = merge_clinical_data(Some(&existing), Some(&incoming));
        assert_eq!(merged.patient_info.gender.as_deref(), Some("female"));

        let merged = merge_clinical_data(Some(&incoming), Some(&existing));
        assert_eq!(merged.patient_info.gender.as_deref(), Some("female"));
    }

    #[test]
    fn two_undated_records_prefer_existing() {
        let mut existing = dated(None);
        existing.symptoms_history.ethnicity = Some("stored".to_string());
        let mut incoming = dated(None);
        incoming.symptoms_history.ethnicity = Some("incoming".to_string());
        incoming.symptoms_history.polyuria = Some(true);

        let merged = merge_clinical_data(Some(&existing), Some(&incoming));

        assert_eq!(merged.symptoms_history.ethnicity.as_deref(), Some("stored"));
        assert_eq!(merged.symptoms_history.polyuria, Some(true));
    }

    #[test]
    fn empty_medication_list_is_backfilled() {
        let mut existing = dated(Some("2024-01-01"));
        existing.symptoms_history.current_medications_keywords = vec!["metformin".to_string()];
        let incoming = dated(Some("2024-06-01"));

        let merged = merge_clinical_data(Some(&existing), Some(&incoming));
        assert_eq!(
            merged.symptoms_history.current_medications_keywords,
            vec!["metformin".to_string()]
        );
    }

    #[test]
    fn merge_with_self_is_identity() {
        let mut record = dated(Some("2024-03-15T08:30:00Z"));
        record.patient_info.name = Some("Same".to_string());
        record.lab_results.bmi = lab(Some(31.2), Some("kg/m2"), Some(StatusFlag::High));
        record.lab_results.hba1c = lab(None, Some("%"), None);
        record.symptoms_history.history_pcos = Some(false);

        assert_eq!(merge_clinical_data(Some(&record), Some(&record)), record);
    }

    #[test]
    fn empty_side_returns_other_unchanged() {
        let mut record = dated(Some("2024-03-15"));
        record.lab_results.hba1c = lab(Some(6.1), Some("%"), Some(StatusFlag::High));

        assert_eq!(merge_clinical_data(None, Some(&record)), record);
        assert_eq!(merge_clinical_data(Some(&record), None), record);
        assert_eq!(
            merge_clinical_data(Some(&ClinicalDataRecord::default()), Some(&record)),
            record
        );
        assert_eq!(merge_clinical_data(None, None), ClinicalDataRecord::default());
    }

    #[test]
    fn report_dates_parse_in_common_shapes() {
        let midnight = parse_report_date("2024-06-01").unwrap();
        assert_eq!(midnight.to_rfc3339(), "2024-06-01T00:00:00+00:00");

        let zulu = parse_report_date("2024-06-01T10:15:00Z").unwrap();
        let offset = parse_report_date("2024-06-01T12:15:00+02:00").unwrap();
        assert_eq!(zulu, offset);

        assert!(parse_report_date("2024-06-01T10:15:00").is_some());

        let minutes_zulu = parse_report_date("2024-06-01T10:15Z").unwrap();
        let minutes_offset = parse_report_date("2024-06-01T12:15+02:00").unwrap();
        assert_eq!(minutes_zulu, zulu);
        assert_eq!(minutes_offset, zulu);
        assert_eq!(
            parse_report_date("2024-06-01 10:15+00:00").unwrap(),
            zulu
        );
        assert_eq!(parse_report_date("20240601").unwrap(), midnight);

        assert!(parse_report_date("01/06/2024").is_none());
        assert!(parse_report_date("").is_none());
    }

    #[test]
    fn later_timestamp_on_same_day_wins() {
        let mut existing = dated(Some("2024-06-01T08:00:00Z"));
        existing.patient_info.name = Some("Morning".to_string());
        let mut incoming = dated(Some("2024-06-01T17:00:00Z"));
        incoming.patient_info.name = Some("Evening".to_string());

        let merged = merge_clinical_data(Some(&existing), Some(&incoming));
        assert_eq!(merged.patient_info.name.as_deref(), Some("Evening"));
    }

    #[test]
    fn minute_precision_zoned_date_counts_as_latest() {
        let mut existing = dated(Some("2024-01-01"));
        existing.patient_info.name = Some("Old".to_string());
        let mut incoming = dated(Some("2024-06-01T10:15Z"));
        incoming.patient_info.name = Some("New".to_string());

        let merged = merge_clinical_data(Some(&existing), Some(&incoming));
        assert_eq!(merged.patient_info.name.as_deref(), Some("New"));
        assert_eq!(
            merged.patient_info.report_date.as_deref(),
            Some("2024-06-01T10:15Z")
        );
    }
}
