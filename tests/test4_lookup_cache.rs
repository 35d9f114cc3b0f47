use rusty_savant::model::PlayerIndex;
use rusty_savant::{IdSource, LookupTable, QueryError, Settings};

const REGISTER: &str = "\
key_person,key_uuid,key_mlbam,key_retro,key_bbref,key_bbref_minors,key_fangraphs,name_last,name_first,mlb_played_first,mlb_played_last
a1,u1,543243,rayr001,rayro01,,4048,Ray,Robbie,2012,2022
a2,u2,605141,bettm001,bettsmo01,,13611,Betts,Mookie,2014,2023
a3,u3,,,,,,,,,
a4,u4,100001,smitw001,smithwi01,,1001,Smith,Will,1998,2004
a5,u5,669257,smitw003,smithwi05,,19197,Smith,Will,2019,2025
";

#[tokio::test]
async fn test4_cached_table_is_reused() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let cache = dir.path().join("nested").join("lookup_table.csv");
    let table = LookupTable::from_register(REGISTER.as_bytes())?;
    assert_eq!(table.len(), 4);
    table.save(&cache)?;

    // an unreachable register URL proves the cache is read instead
    let settings = Settings {
        lookup_cache: cache.clone(),
        lookup_url: "http://127.0.0.1:9/people.csv".to_string(),
        ..Settings::default()
    };
    let loaded = LookupTable::load(&settings, false).await?;
    assert_eq!(loaded.len(), 4);
    assert!(loaded.exists("605141"));
    assert!(!loaded.exists("999999"));
    assert_eq!(loaded.get_name("543243")?, "Robbie Ray");
    Ok(())
}

#[tokio::test]
async fn test4_id_by_name_prefers_latest_debut() -> Result<(), Box<dyn std::error::Error>> {
    let table = LookupTable::from_register(REGISTER.as_bytes())?;
    assert_eq!(table.get_id("will smith", IdSource::Mlbam, None)?, "669257");
    assert_eq!(table.get_id("Will Smith", IdSource::Bbref, Some(1998))?, "smithwi01");
    assert_eq!(table.get_id("Mookie Betts", IdSource::Fangraphs, None)?, "13611");

    match table.get_id("Nobody Here", IdSource::Mlbam, None) {
        Err(QueryError::NameNotFound(name)) => assert_eq!(name, "nobody here"),
        other => panic!("unexpected result {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test4_lookup_by_any_id() -> Result<(), Box<dyn std::error::Error>> {
    let table = LookupTable::from_register(REGISTER.as_bytes())?;
    for id in ["543243", "rayr001", "rayro01", "4048"] {
        let found = table.lookup_id(id, true)?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name_last, "Ray");
    }
    assert!(matches!(
        table.lookup_id("nope", false),
        Err(QueryError::IdNotFound(_))
    ));
    Ok(())
}
