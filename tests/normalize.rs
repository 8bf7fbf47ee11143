use chrono::NaiveDate;
use covid_loader::data::{is_missing, parse_count, parse_naive_date};
use covid_loader::normalize::{RejectReason, normalize};
use covid_loader::record::RawRecord;
use proptest::prelude::*;

fn raw(location: &str, date: Option<&str>) -> RawRecord {
    RawRecord {
        line: 2,
        iso_code: Some("KEN".into()),
        continent: Some("Africa".into()),
        location: Some(location.into()),
        date: date.map(str::to_string),
        ..RawRecord::default()
    }
}

#[test]
fn numeric_round_trip_examples() {
    let mut row = raw("Kenya", Some("2024-01-05"));
    row.total_cases = Some("1234.0".into());
    row.new_cases = Some("".into());
    row.total_deaths = Some("twelve".into());
    row.new_deaths = None;
    let record = normalize(row).expect("valid row");
    assert_eq!(record.total_cases, Some(1234));
    assert_eq!(record.new_cases, None);
    assert_eq!(record.total_deaths, None);
    assert_eq!(record.new_deaths, None);
}

#[test]
fn missing_date_column_value_is_rejected() {
    let rejection = normalize(raw("Kenya", None)).unwrap_err();
    assert_eq!(rejection.reason, RejectReason::InvalidDate);
    assert_eq!(rejection.value, None);
}

#[test]
fn normalize_is_deterministic() {
    let mut row = raw("Kenya", Some("2024-01-05"));
    row.total_cases = Some("99.9".into());
    assert_eq!(normalize(row.clone()), normalize(row));
}

proptest! {
    #[test]
    fn valid_rows_never_fail_on_numeric_noise(
        location in "[A-Za-z][A-Za-z ]{0,20}",
        day in 1u32..=28,
        cells in proptest::collection::vec(any::<String>(), 4)
    ) {
        prop_assume!(!is_missing(&location));
        let date = format!("2024-02-{day:02}");
        let mut row = raw(&location, Some(&date));
        row.total_cases = Some(cells[0].clone());
        row.new_cases = Some(cells[1].clone());
        row.total_deaths = Some(cells[2].clone());
        row.new_deaths = Some(cells[3].clone());
        let record = normalize(row).expect("row with valid date and location");
        prop_assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 2, day).unwrap());
        prop_assert_eq!(record.location, location.trim().to_string());
        for value in [record.total_cases, record.new_cases, record.total_deaths, record.new_deaths] {
            prop_assert!(value.is_none_or(|v| v >= 0));
        }
    }

    #[test]
    fn non_date_text_is_rejected(text in "[A-Za-z ]{0,16}") {
        prop_assume!(parse_naive_date(&text).is_none());
        let rejection = normalize(raw("Kenya", Some(&text))).unwrap_err();
        prop_assert_eq!(rejection.reason, RejectReason::InvalidDate);
    }

    #[test]
    fn whole_floats_coerce_to_the_same_integer(n in 0i64..1_000_000_000) {
        prop_assert_eq!(parse_count(&format!("{n}.0")), Some(n));
        prop_assert_eq!(parse_count(&n.to_string()), Some(n));
    }

    #[test]
    fn fractions_truncate_toward_zero(whole in 0i64..1_000_000, frac in 0u32..1000) {
        prop_assert_eq!(parse_count(&format!("{whole}.{frac:03}")), Some(whole));
    }
}
