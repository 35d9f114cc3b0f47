mod common;

use chrono::NaiveDate;
use rusty_savant::{Cell, ParamValue, QueryArgs, QueryError, SearchOptions};

use crate::common::{SEARCH_CSV, first_value, savant_with};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
}

#[tokio::test]
async fn test2_pitcher_search() -> Result<(), Box<dyn std::error::Error>> {
    let (savant, calls) = savant_with(SEARCH_CSV, &["543243"])?;
    let savant = savant.with_today(today());
    let result = savant
        .pitcher(
            "543243",
            "2021-04-01",
            "2021-04-10",
            QueryArgs::new(),
            SearchOptions::default(),
        )
        .await?;

    let calls = calls.lock().unwrap();
    let (_, requests) = &calls[0];
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(first_value(request, "hfSea"), Some("2021|"));
    assert_eq!(first_value(request, "game_date_gt"), Some("2021-04-01"));
    assert_eq!(first_value(request, "game_date_lt"), Some("2021-04-10"));
    assert_eq!(first_value(request, "pitchers_lookup[]"), Some("543243"));
    assert_eq!(first_value(request, "player_type"), Some("pitcher"));

    let table = &result.table;
    assert_eq!(table.len(), 2);
    assert!(table.column_index("umpire").is_none());
    assert_eq!(table.get(0, "pitch_type"), Some(&Cell::Text("FF".to_string())));
    assert_eq!(table.get(0, "game_pk"), Some(&Cell::Int(634_642)));
    assert!(table.column_index("bauer_units").is_some());
    Ok(())
}

#[tokio::test]
async fn test2_unknown_pitcher_is_dropped() -> Result<(), Box<dyn std::error::Error>> {
    let (savant, calls) = savant_with(SEARCH_CSV, &["543243"])?;
    let savant = savant.with_today(today());
    savant
        .pitcher(
            vec!["543243", "999999999"],
            "2021-04-01",
            "2021-04-02",
            QueryArgs::new(),
            SearchOptions::default(),
        )
        .await?;

    let calls = calls.lock().unwrap();
    let request = &calls[0].1[0];
    assert_eq!(
        request.get("pitchers_lookup[]"),
        Some(&vec!["543243".to_string()])
    );
    Ok(())
}

#[tokio::test]
async fn test2_unknown_field_suggests() -> Result<(), Box<dyn std::error::Error>> {
    let (savant, calls) = savant_with(SEARCH_CSV, &[])?;
    let args = QueryArgs::new().with("pitch_typ", "FF");
    let err = savant
        .dates("2021-04-01", ParamValue::Null, args, SearchOptions::default())
        .await
        .unwrap_err();
    match err {
        QueryError::FieldName { suggestions, .. } => {
            assert!(suggestions.contains(&"pitch_type".to_string()));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(calls.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test2_aggregate_keeps_raw_rows() -> Result<(), Box<dyn std::error::Error>> {
    let body = "player_id,player_name,pitches\n543243,\"Ray, Robbie\",180\n";
    let (savant, calls) = savant_with(body, &[])?;
    let savant = savant.with_today(today());
    let options = SearchOptions {
        aggregate: true,
        ..SearchOptions::default()
    };
    let result = savant
        .dates("2021-05-01", "2021-05-01", QueryArgs::new(), options)
        .await?;

    assert_eq!(result.table.len(), 1);
    assert_eq!(result.table.get(0, "pitches"), Some(&Cell::Int(180)));
    let calls = calls.lock().unwrap();
    assert_eq!(first_value(&calls[0].1[0], "type"), Some("aggregate"));
    Ok(())
}

#[tokio::test]
async fn test2_future_dates_are_advised() -> Result<(), Box<dyn std::error::Error>> {
    let (savant, _calls) = savant_with(SEARCH_CSV, &[])?;
    let savant = savant.with_today(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
    let result = savant
        .dates("2026-04-28", "2026-05-03", QueryArgs::new(), SearchOptions::default())
        .await?;
    assert!(!result.advisories.is_empty());
    Ok(())
}

#[tokio::test]
async fn test2_current_season_dates_are_searchable() -> Result<(), Box<dyn std::error::Error>> {
    let (savant, calls) = savant_with(SEARCH_CSV, &[])?;
    let savant = savant.with_today(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
    let result = savant
        .dates("2026-10-13", "2026-10-19", QueryArgs::new(), SearchOptions::default())
        .await?;
    assert!(result.advisories.iter().any(|note| note.contains("refreshed")));

    let calls = calls.lock().unwrap();
    assert_eq!(first_value(&calls[0].1[0], "hfSea"), Some("2026|"));
    Ok(())
}

#[tokio::test]
async fn test2_start_before_data_is_advised_not_rejected() -> Result<(), Box<dyn std::error::Error>>
{
    let (savant, calls) = savant_with(SEARCH_CSV, &[])?;
    let savant = savant.with_today(today());
    let result = savant
        .dates("2007-09-01", "2008-04-05", QueryArgs::new(), SearchOptions::default())
        .await?;
    assert!(
        result
            .advisories
            .iter()
            .any(|note| note.contains("2008 season onwards"))
    );

    let calls = calls.lock().unwrap();
    assert_eq!(first_value(&calls[0].1[0], "hfSea"), Some("2008|"));
    Ok(())
}
