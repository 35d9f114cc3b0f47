#![allow(dead_code)]

use async_trait::async_trait;
use rusty_savant::controller::download::Transport;
use rusty_savant::model::{ParamMap, Registry};
use rusty_savant::{QueryError, Savant, Settings};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub const SEARCH_CSV: &str = "\
pitch_type,game_date,release_speed,release_spin_rate,release_extension,player_name,batter,pitcher,game_pk,at_bat_number,pitch_number,umpire
FF,2021-04-01,95.1,2300,6.5,\"Ray, Robbie\",605141,543243,634642,2,1,
SL,2021-04-01,85.3,2550,6.4,\"Ray, Robbie\",605141,543243,634642,2,2,
";

pub type Calls = Arc<Mutex<Vec<(String, Vec<ParamMap>)>>>;

/// Records every call and answers each request with the same canned body.
pub struct RecordingTransport {
    pub calls: Calls,
    pub body: String,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn execute(&self, url: &str, param_sets: &[ParamMap]) -> Result<String, QueryError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((url.to_string(), param_sets.to_vec()));
        }
        Ok(self.body.repeat(param_sets.len()))
    }
}

pub fn players(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|id| (*id).to_string()).collect()
}

/// Client wired to a recording transport, plus the shared call log.
pub fn savant_with(body: &str, ids: &[&str]) -> Result<(Savant, Calls), QueryError> {
    let calls = Calls::default();
    let transport = RecordingTransport {
        calls: Arc::clone(&calls),
        body: body.to_string(),
    };
    let savant = Savant::new(
        Settings::default(),
        Registry::builtin()?,
        Box::new(transport),
        Box::new(players(ids)),
    );
    Ok((savant, calls))
}

pub fn first_value<'a>(params: &'a ParamMap, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|values| values.first()).map(String::as_str)
}
