use crate::config::Settings;
use crate::controller::download::HttpTransport;
use crate::error::QueryError;
use crate::model::PlayerIndex;
use ahash::RandomState;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;

/// One person from the Chadwick register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    #[serde(default)]
    pub name_full: String,
    #[serde(default)]
    pub name_first: String,
    #[serde(default)]
    pub name_last: String,
    #[serde(default)]
    pub key_mlbam: String,
    #[serde(default)]
    pub key_retro: String,
    #[serde(default)]
    pub key_bbref: String,
    #[serde(default)]
    pub key_bbref_minors: String,
    #[serde(default)]
    pub key_fangraphs: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub mlb_played_first: Option<i32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub mlb_played_last: Option<i32>,
}

impl PlayerRecord {
    #[must_use]
    pub fn played_in_majors(&self) -> bool {
        self.mlb_played_first.is_some() && self.mlb_played_last.is_some()
    }

    #[must_use]
    pub fn key(&self, source: IdSource) -> &str {
        match source {
            IdSource::Mlbam => &self.key_mlbam,
            IdSource::Fangraphs => &self.key_fangraphs,
            IdSource::Bbref => &self.key_bbref,
            IdSource::Retro => &self.key_retro,
        }
    }

    fn has_id(&self, id: &str) -> bool {
        IdSource::ALL.iter().any(|source| self.key(*source) == id)
    }

    fn has_name(&self, name: &str) -> bool {
        [&self.name_full, &self.name_first, &self.name_last]
            .iter()
            .any(|candidate| candidate.trim().to_lowercase() == name)
    }

    fn is_blank(&self) -> bool {
        self.name_first.is_empty()
            && self.name_last.is_empty()
            && self.key_mlbam.is_empty()
            && self.key_retro.is_empty()
            && self.key_bbref.is_empty()
            && self.key_bbref_minors.is_empty()
            && self.key_fangraphs.is_empty()
            && self.mlb_played_first.is_none()
            && self.mlb_played_last.is_none()
    }
}

/// Which id system a player id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    Mlbam,
    Fangraphs,
    Bbref,
    Retro,
}

impl IdSource {
    pub const ALL: [IdSource; 4] = [Self::Mlbam, Self::Fangraphs, Self::Bbref, Self::Retro];
}

impl fmt::Display for IdSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mlbam => "mlbam",
            Self::Fangraphs => "fangraphs",
            Self::Bbref => "bbref",
            Self::Retro => "retro",
        })
    }
}

impl FromStr for IdSource {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mlbam" => Ok(Self::Mlbam),
            "fangraphs" => Ok(Self::Fangraphs),
            "bbref" => Ok(Self::Bbref),
            "retro" => Ok(Self::Retro),
            _ => Err(QueryError::InvalidSource(s.to_string())),
        }
    }
}

/// Player register used to resolve names and ids across id systems.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    players: Vec<PlayerRecord>,
    mlb_ids: HashSet<String, RandomState>,
}

impl LookupTable {
    #[must_use]
    pub fn new(players: Vec<PlayerRecord>) -> Self {
        let mlb_ids = players
            .iter()
            .filter(|player| player.played_in_majors())
            .flat_map(|player| {
                IdSource::ALL
                    .iter()
                    .map(|source| player.key(*source).to_string())
                    .filter(|id| !id.is_empty())
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { players, mlb_ids }
    }

    /// Read the cached register, downloading it first when missing or when
    /// `refresh` is set.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the cache cannot be read or written, or the download fails
    pub async fn load(settings: &Settings, refresh: bool) -> Result<Self, QueryError> {
        let cache = &settings.lookup_cache;
        if cache.is_file() && !refresh {
            tracing::debug!(path = %cache.display(), "using cached lookup table");
            return Self::from_path(cache);
        }

        tracing::info!(url = %settings.lookup_url, "downloading lookup table");
        let transport = HttpTransport::new(settings)?;
        let text = transport.get_text(&settings.lookup_url).await?;
        let table = Self::from_register(text.as_bytes())?;
        table.save(cache)?;
        tracing::info!(players = table.len(), path = %cache.display(), "cached lookup table");
        Ok(table)
    }

    /// Read a table previously written by [`LookupTable::save`].
    ///
    /// # Errors
    ///
    /// Will return `Err` if the file cannot be read or parsed
    pub fn from_path(path: &Path) -> Result<Self, QueryError> {
        let file = fs::File::open(path)
            .map_err(|e| QueryError::Io(format!("opening {}: {e}", path.display())))?;
        Self::from_reader(file)
    }

    /// # Errors
    ///
    /// Will return `Err` if the data is not a readable lookup CSV
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, QueryError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let players = csv_reader
            .deserialize::<PlayerRecord>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(players))
    }

    /// Parse the raw register download: drop blank rows and build full names.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the data is not a readable register CSV
    pub fn from_register<R: io::Read>(reader: R) -> Result<Self, QueryError> {
        let mut table = Self::from_reader(reader)?;
        let before = table.players.len();
        table.players.retain(|player| !player.is_blank());
        for player in &mut table.players {
            player.name_full = format!("{} {}", player.name_first, player.name_last);
        }
        tracing::debug!(dropped = before - table.players.len(), "dropped blank register rows");
        Ok(Self::new(table.players))
    }

    /// # Errors
    ///
    /// Will return `Err` if the file or its parent directory cannot be written
    pub fn save(&self, path: &Path) -> Result<(), QueryError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| QueryError::Io(format!("creating {}: {e}", parent.display())))?;
        }
        let file = fs::File::create(path)
            .map_err(|e| QueryError::Io(format!("writing {}: {e}", path.display())))?;
        self.write_csv(file)
    }

    /// # Errors
    ///
    /// Will return `Err` if writing fails
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), QueryError> {
        write_records(writer, self.players.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn players(&self, mlb_only: bool) -> impl Iterator<Item = &PlayerRecord> {
        self.players
            .iter()
            .filter(move |player| !mlb_only || player.played_in_majors())
    }

    /// Every player with `id` under any id system.
    ///
    /// # Errors
    ///
    /// Will return `Err` if no player matches
    pub fn lookup_id(&self, id: &str, mlb_only: bool) -> Result<Vec<&PlayerRecord>, QueryError> {
        let id = id.trim();
        let found: Vec<&PlayerRecord> = self.players(mlb_only).filter(|p| p.has_id(id)).collect();
        if found.is_empty() {
            return Err(QueryError::IdNotFound(id.to_string()));
        }
        Ok(found)
    }

    /// Every player whose full, first or last name matches, ignoring case.
    ///
    /// # Errors
    ///
    /// Will return `Err` if no player matches
    pub fn lookup_name(
        &self,
        name: &str,
        mlb_only: bool,
    ) -> Result<Vec<&PlayerRecord>, QueryError> {
        let wanted = name.trim().to_lowercase();
        let found: Vec<&PlayerRecord> = self
            .players(mlb_only)
            .filter(|p| p.has_name(&wanted))
            .collect();
        if found.is_empty() {
            return Err(QueryError::NameNotFound(wanted));
        }
        Ok(found)
    }

    /// # Errors
    ///
    /// Will return `Err` if no major league player has `id`
    pub fn get_name(&self, id: &str) -> Result<String, QueryError> {
        self.lookup_id(id, true)
            .map(|found| found.first().map(|p| p.name_full.clone()).unwrap_or_default())
    }

    /// Id of the player called `name` under `source`.
    ///
    /// Several matches are narrowed by debut year when given, otherwise the
    /// most recent debut wins.
    ///
    /// # Errors
    ///
    /// Will return `Err` if no major league player matches
    pub fn get_id(
        &self,
        name: &str,
        source: IdSource,
        start_year: Option<i32>,
    ) -> Result<String, QueryError> {
        let found = self.lookup_name(name, true)?;
        let chosen = if found.len() > 1 {
            match start_year {
                Some(year) => found
                    .into_iter()
                    .find(|p| p.mlb_played_first == Some(year)),
                None => found.into_iter().max_by_key(|p| p.mlb_played_first),
            }
        } else {
            found.into_iter().next()
        };
        chosen
            .map(|player| player.key(source).to_string())
            .ok_or_else(|| QueryError::NameNotFound(name.trim().to_lowercase()))
    }
}

impl PlayerIndex for LookupTable {
    fn exists(&self, id: &str) -> bool {
        self.mlb_ids.contains(id)
    }
}

/// # Errors
///
/// Will return `Err` if writing fails
pub fn write_records<'a, W, I>(writer: W, records: I) -> Result<(), QueryError>
where
    W: io::Write,
    I: IntoIterator<Item = &'a PlayerRecord>,
{
    let mut out = csv::Writer::from_writer(writer);
    for record in records {
        out.serialize(record)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTER: &str = "\
key_person,key_uuid,key_mlbam,key_retro,key_bbref,key_bbref_minors,key_fangraphs,name_last,name_first,mlb_played_first,mlb_played_last
a1,u1,543243,rayr001,rayro01,,4048,Ray,Robbie,2012,2022
a2,u2,605141,bettm001,bettsmo01,,13611,Betts,Mookie,2014,2023
a3,u3,,,,smithjo99,,Smith,Joe,,
a4,u4,,,,,,,,,
a5,u5,112233,smitj001,smithjo01,,999,Smith,Joe,1999,2004
a6,u6,445566,smitj002,smithjo02,,1000,Smith,Joe,2008,2011
";

    fn table() -> LookupTable {
        LookupTable::from_register(REGISTER.as_bytes()).unwrap()
    }

    #[test]
    fn register_drops_blank_rows_and_builds_full_names() {
        let table = table();
        assert_eq!(table.len(), 5);
        assert_eq!(table.get_name("605141").unwrap(), "Mookie Betts");
    }

    #[test]
    fn exists_only_for_major_leaguers() {
        let table = table();
        assert!(table.exists("543243"));
        assert!(table.exists("rayro01"));
        assert!(!table.exists("smithjo99"));
        assert!(!table.exists("bogus"));
    }

    #[test]
    fn lookup_by_any_id_system() {
        let table = table();
        let found = table.lookup_id("bettm001", true).unwrap();
        assert_eq!(found[0].key_mlbam, "605141");
        assert!(matches!(
            table.lookup_id("nope", true),
            Err(QueryError::IdNotFound(_))
        ));
    }

    #[test]
    fn lookup_name_respects_mlb_only() {
        let table = table();
        assert_eq!(table.lookup_name("joe smith", true).unwrap().len(), 2);
        assert_eq!(table.lookup_name("JOE SMITH", false).unwrap().len(), 3);
        assert_eq!(table.lookup_name("Betts", true).unwrap().len(), 1);
    }

    #[test]
    fn get_id_prefers_latest_debut_or_given_year() {
        let table = table();
        assert_eq!(
            table.get_id("Joe Smith", IdSource::Mlbam, None).unwrap(),
            "445566"
        );
        assert_eq!(
            table.get_id("Joe Smith", IdSource::Bbref, Some(1999)).unwrap(),
            "smithjo01"
        );
        assert!(table.get_id("Joe Smith", IdSource::Mlbam, Some(1950)).is_err());
    }

    #[test]
    fn id_source_parsing() {
        assert_eq!("FanGraphs".parse::<IdSource>().unwrap(), IdSource::Fangraphs);
        assert!(matches!(
            "savant".parse::<IdSource>(),
            Err(QueryError::InvalidSource(_))
        ));
    }

    #[test]
    fn saved_table_reads_back() {
        let table = table();
        let mut buffer = Vec::new();
        table.write_csv(&mut buffer).unwrap();
        let reread = LookupTable::from_reader(buffer.as_slice()).unwrap();
        assert_eq!(reread.len(), table.len());
        assert_eq!(reread.get_name("543243").unwrap(), "Robbie Ray");
    }
}
