//! Static reference catalog of teams and grounds
//!
//! Loaded once and shared by reference; never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::{GroundId, Result, TeamId, TipperError};

/// A playing ground and the state it sits in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ground {
    pub id: GroundId,
    pub name: String,
    pub abbreviation: String,
    pub state: String,
}

/// An AFL club
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub region: String,
    pub mascot: String,
    pub api_name: String,
    pub abbreviation: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub homes: Vec<GroundId>,
    #[serde(default)]
    pub colours: Vec<String>,
}

impl Team {
    pub fn matches_name(&self, name: &str) -> bool {
        let name_lower = name.to_lowercase();
        [&self.region, &self.mascot, &self.api_name, &self.abbreviation]
            .into_iter()
            .chain(self.aliases.iter())
            .any(|n| n.to_lowercase() == name_lower)
    }
}

#[derive(Serialize, Deserialize)]
struct CatalogFile {
    teams: Vec<Team>,
    grounds: Vec<Ground>,
}

/// Immutable lookup tables for teams and grounds
#[derive(Debug, Clone)]
pub struct Catalog {
    teams: Vec<Team>,
    grounds: HashMap<GroundId, Ground>,
}

impl Catalog {
    pub fn new(teams: Vec<Team>, grounds: Vec<Ground>) -> Self {
        Catalog {
            teams,
            grounds: grounds.into_iter().map(|g| (g.id, g)).collect(),
        }
    }

    /// Load a catalog from a JSON file with `teams` and `grounds` arrays
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: CatalogFile = serde_json::from_str(&content)?;
        Ok(Self::new(file.teams, file.grounds))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut grounds: Vec<Ground> = self.grounds.values().cloned().collect();
        grounds.sort_by_key(|g| g.id);
        let file = CatalogFile {
            teams: self.teams.clone(),
            grounds,
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    /// Find a team by region, mascot, api name, abbreviation or alias
    pub fn find_team(&self, name: &str) -> Result<&Team> {
        self.teams
            .iter()
            .find(|t| t.matches_name(name))
            .ok_or_else(|| TipperError::UnknownTeam(name.to_string()))
    }

    pub fn ground(&self, id: GroundId) -> Option<&Ground> {
        self.grounds.get(&id)
    }

    /// State of a ground, if the ground is catalogued
    pub fn state_of(&self, id: GroundId) -> Option<&str> {
        self.grounds.get(&id).map(|g| g.state.as_str())
    }

    /// Display name used in reports (mascot, falling back to the raw id)
    pub fn display_name(&self, id: TeamId) -> String {
        self.team(id)
            .map(|t| t.mascot.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// The AFL clubs and their grounds
    pub fn afl() -> Self {
        let ground = |id: i64, name: &str, abbreviation: &str, state: &str| Ground {
            id: GroundId(id),
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            state: state.to_string(),
        };
        let grounds = vec![
            ground(1, "Adelaide Oval", "AO", "SA"),
            ground(2, "Gabba", "G", "QLD"),
            ground(3, "Docklands Stadium", "ES", "VIC"),
            ground(4, "Melbourne Cricket Ground", "MCG", "VIC"),
            ground(5, "Subiaco Oval", "PS", "WA"),
            ground(6, "WACA", "WACA", "WA"),
            ground(7, "Kardinia Park", "SS", "VIC"),
            ground(8, "Carrara Stadium", "MS", "QLD"),
            ground(9, "Sydney Showground Stadium", "SPS", "NSW"),
            ground(10, "Stadium Australia", "ANZ", "NSW"),
            ground(11, "Manuka Oval", "STO", "ACT"),
            ground(12, "York Park", "AU", "TAS"),
            ground(13, "Sydney Cricket Ground", "SCG", "NSW"),
        ];

        let team = |id: i64,
                    region: &str,
                    mascot: &str,
                    api_name: &str,
                    abbreviation: &str,
                    aliases: &[&str],
                    homes: &[i64]| Team {
            id: TeamId(id),
            region: region.to_string(),
            mascot: mascot.to_string(),
            api_name: api_name.to_string(),
            abbreviation: abbreviation.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            homes: homes.iter().map(|g| GroundId(*g)).collect(),
            colours: Vec::new(),
        };
        let mut teams = vec![
            team(1, "Adelaide", "Crows", "Adelaide", "ADEL", &["Adelaide Crows"], &[1]),
            team(2, "Brisbane", "Lions", "Brisbane Lions", "BL", &[], &[2]),
            team(3, "Carlton", "Blues", "Carlton", "CARL", &[], &[3, 4]),
            team(4, "Collingwood", "Magpies", "Collingwood", "COLL", &[], &[4]),
            team(5, "Essendon", "Bombers", "Essendon", "ESS", &[], &[3, 4]),
            team(6, "Fremantle", "Dockers", "Fremantle", "FRE", &[], &[5, 6]),
            team(7, "Geelong", "Cats", "Geelong", "GEEL", &["Geelong Cats"], &[7]),
            team(8, "Gold Coast", "Suns", "Gold Coast", "GCFC", &["Gold Coast Suns"], &[8]),
            team(
                9,
                "Greater Western Sydney",
                "Giants",
                "GWS Giants",
                "GWS",
                &["GWS"],
                &[9, 10, 11],
            ),
            team(10, "Hawthorn", "Hawks", "Hawthorn", "HAW", &[], &[4, 12]),
            team(11, "Melbourne", "Demons", "Melbourne", "MELB", &[], &[4]),
            team(12, "North Melbourne", "Kangaroos", "North Melbourne", "NMFC", &[], &[3]),
            team(13, "Port Adelaide", "Power", "Port Adelaide", "PORT", &[], &[1]),
            team(14, "Richmond", "Tigers", "Richmond", "RICH", &[], &[4]),
            team(15, "St. Kilda", "Saints", "St Kilda", "STK", &[], &[3, 4]),
            team(16, "Sydney", "Swans", "Sydney", "SYD", &["Sydney Swans"], &[13, 10]),
            team(17, "West Coast", "Eagles", "West Coast", "WCE", &["West Coast Eagles"], &[6]),
            team(18, "Western", "Bulldogs", "Western Bulldogs", "WB", &[], &[3]),
        ];

        // Club colours, in team id order
        let colours: [&[&str]; 18] = [
            &["Navy Blue", "Red", "Gold"],
            &["Maroon", "Blue", "Gold"],
            &["Navy Blue", "White"],
            &["Black", "White"],
            &["Red", "Black"],
            &["Purple", "White"],
            &["Navy Blue", "White"],
            &["Red", "Gold", "Blue"],
            &["Orange", "Charcoal", "White"],
            &["Brown", "Gold"],
            &["Navy Blue", "Red"],
            &["Royal Blue", "White"],
            &["Black", "White", "Teal", "Silver"],
            &["Yellow", "Black"],
            &["Red", "White", "Black"],
            &["Red", "White"],
            &["Navy Blue", "White", "Gold"],
            &["Red", "White", "Blue"],
        ];
        for (team, colours) in teams.iter_mut().zip(colours) {
            team.colours = colours.iter().map(|c| c.to_string()).collect();
        }

        Self::new(teams, grounds)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::afl()
    }
}
