use emissions_explorer::domain::{EntityRecord, Metric, PollutionRecord};
use emissions_explorer::view::{
    CountryRow, Dashboard, NO_DATA_COLOR, Rgb, Selection, color_from_value, danger_threshold,
    filter_rows, is_united_states, metric_rows, select, us_state_emissions, validate_percentile,
};

fn entity(iso: &str, country: &str, co2: Option<f64>, per_capita: Option<f64>) -> EntityRecord {
    EntityRecord {
        iso_code: iso.to_string(),
        country: country.to_string(),
        year: 2022,
        co2,
        population: None,
        co2_per_capita: per_capita,
    }
}

fn rows(values: &[f64]) -> Vec<CountryRow> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| CountryRow {
            iso_code: format!("C{index:02}"),
            country: format!("Country {index}"),
            year: 2022,
            value: Some(*value),
        })
        .collect()
}

#[test]
fn color_ramp_is_monotonic() {
    let mut previous = color_from_value(Some(0.0), 0.0, 100.0);
    assert_eq!(previous, Rgb(70, 40, 40));
    for step in 1..=100 {
        let color = color_from_value(Some(step as f64), 0.0, 100.0);
        assert!(color.0 >= previous.0);
        assert_eq!((color.1, color.2), (40, 40));
        previous = color;
    }
    assert_eq!(previous, Rgb(255, 40, 40));
}

#[test]
fn color_ramp_handles_missing_and_degenerate_input() {
    assert_eq!(color_from_value(None, 0.0, 1.0), NO_DATA_COLOR);
    assert_eq!(color_from_value(Some(5.0), 3.0, 3.0), NO_DATA_COLOR);
    assert_eq!(color_from_value(Some(-10.0), 0.0, 1.0), Rgb(70, 40, 40));
    assert_eq!(color_from_value(Some(10.0), 0.0, 1.0), Rgb(255, 40, 40));
}

#[test]
fn danger_threshold_uses_nearest_rank_and_clamps() {
    let values: Vec<f64> = (1..=10).map(f64::from).collect();
    let rows = rows(&values);
    assert_eq!(danger_threshold(&rows, 90), Some(9.0));
    assert_eq!(danger_threshold(&rows, 50), Some(5.0));
    assert_eq!(danger_threshold(&rows, 10), Some(5.0));
    assert_eq!(danger_threshold(&rows, 100), Some(10.0));
    assert_eq!(danger_threshold(&[], 90), None);
}

#[test]
fn percentile_validation_matches_slider_range() {
    assert!(validate_percentile(50).is_ok());
    assert!(validate_percentile(99).is_ok());
    assert!(validate_percentile(49).is_err());
    assert!(validate_percentile(100).is_err());
}

#[test]
fn per_capita_metric_reads_its_own_column() {
    let emissions = vec![entity("QAT", "Qatar", Some(100.0), Some(37.0))];
    let rows = metric_rows(Metric::Co2PerCapita, &emissions, &[]);
    assert_eq!(rows[0].value, Some(37.0));
}

#[test]
fn pm25_rows_fall_back_to_iso_code_for_names() {
    let emissions = vec![entity("FRA", "France", Some(300.0), None)];
    let pollution = vec![
        PollutionRecord {
            iso_code: "FRA".to_string(),
            year: 2021,
            pm25: 10.5,
        },
        PollutionRecord {
            iso_code: "XKX".to_string(),
            year: 2020,
            pm25: 14.0,
        },
    ];

    let rows = metric_rows(Metric::Pm25, &emissions, &pollution);

    assert_eq!(rows[0].country, "France");
    assert_eq!(rows[0].year, 2021);
    assert_eq!(rows[1].country, "XKX");
}

#[test]
fn filter_is_case_insensitive_and_selection_reports_empty() {
    let emissions = vec![
        entity("DEU", "Germany", Some(670.0), Some(8.0)),
        entity("NER", "Niger", Some(2.5), Some(0.1)),
        entity("NGA", "Nigeria", Some(130.0), Some(0.6)),
    ];
    let dashboard = Dashboard::build(Metric::TotalCo2, &emissions, &[], 90);

    let matches = dashboard.filtered("NIGER");
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].country, "Nigeria");
    assert_matches_selected(select(&matches, Some("Niger")), "Niger");
    assert_matches_selected(select(&matches, Some("Chile")), "Nigeria");

    assert!(filter_rows(&dashboard.rows, "  ").len() == 3);
    assert_eq!(select(&dashboard.filtered("zzz"), None), Selection::NoMatches);
}

fn assert_matches_selected(selection: Selection, expected: &str) {
    match selection {
        Selection::Selected(row) => assert_eq!(row.country, expected),
        Selection::NoMatches => panic!("expected {expected}, got no matches"),
    }
}

#[test]
fn state_demo_only_for_united_states() {
    assert_eq!(us_state_emissions().len(), 7);
    assert!(is_united_states("United States"));
    assert!(is_united_states("USA"));
    assert!(!is_united_states("United Kingdom"));

    let emissions = vec![
        entity("USA", "United States", Some(5000.0), Some(15.0)),
        entity("GBR", "United Kingdom", Some(320.0), Some(4.7)),
    ];
    let dashboard = Dashboard::build(Metric::TotalCo2, &emissions, &[], 99);
    let usa = dashboard.panel(&dashboard.rows[0]);
    let gbr = dashboard.panel(&dashboard.rows[1]);

    assert_eq!(usa.states.first().map(|bar| bar.state.as_str()), Some("Texas"));
    assert_eq!(usa.color, Rgb(255, 40, 40));
    assert!(gbr.states.is_empty());
    assert_eq!(gbr.color, Rgb(70, 40, 40));
    assert!(usa.dangerous);
    assert!(!gbr.dangerous);
}
