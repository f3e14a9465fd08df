use emissions_explorer::worldbank::parse_pm25_json;

fn entry(iso3: &str, date: &str, value: &str) -> String {
    format!(
        r#"{{"indicator":{{"id":"EN.ATM.PM25.MC.M3","value":"PM2.5 air pollution"}},"country":{{"id":"XX","value":"Somewhere"}},"countryiso3code":"{iso3}","date":"{date}","value":{value},"unit":"","obs_status":"","decimal":1}}"#
    )
}

fn payload(entries: &[String]) -> Vec<u8> {
    format!(
        r#"[{{"page":1,"pages":1,"per_page":20000,"total":{}}},[{}]]"#,
        entries.len(),
        entries.join(",")
    )
    .into_bytes()
}

#[test]
fn keeps_latest_year_per_country() {
    let content = payload(&[entry("FRA", "2018", "12.0"), entry("FRA", "2021", "10.5")]);

    let parsed = parse_pm25_json(&content);

    assert_eq!(parsed.diagnostic, None);
    assert_eq!(parsed.records.len(), 1);
    let france = &parsed.records[0];
    assert_eq!(france.iso_code, "FRA");
    assert_eq!(france.year, 2021);
    assert_eq!(france.pm25, 10.5);
}

#[test]
fn null_values_are_discarded_before_comparing_years() {
    let content = payload(&[
        entry("DEU", "2020", "11.9"),
        entry("DEU", "2022", "null"),
        entry("", "2020", "30.1"),
        entry("ITA", "", "17.0"),
    ]);

    let parsed = parse_pm25_json(&content);

    assert_eq!(parsed.records.len(), 1);
    assert_eq!(parsed.records[0].iso_code, "DEU");
    assert_eq!(parsed.records[0].year, 2020);
    assert_eq!(parsed.records[0].pm25, 11.9);
}

#[test]
fn malformed_shapes_become_empty_with_diagnostic() {
    for body in [
        &b"{\"page\":1}"[..],
        &b"[]"[..],
        &b"[{\"page\":1}, {\"rows\": []}]"[..],
        &b"<html>gateway timeout</html>"[..],
    ] {
        let parsed = parse_pm25_json(body);
        assert!(parsed.records.is_empty());
        assert!(parsed.diagnostic.is_some(), "no diagnostic for {body:?}");
    }
}
