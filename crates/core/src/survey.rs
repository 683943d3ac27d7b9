//! In-memory multibeam survey and its JSON file form.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const SURVEY_VERSION: u32 = 1;

/// Edit flags carried by each beam.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeamFlags(pub u8);

impl BeamFlags {
    pub const NONE: BeamFlags = BeamFlags(0);
    pub const NULL_BEAM: BeamFlags = BeamFlags(0x01);
    pub const MANUALLY_EDITED: BeamFlags = BeamFlags(0x02);
    pub const FILTER_EDITED: BeamFlags = BeamFlags(0x04);

    /// Any bit that excludes a beam from filtering.
    pub const IGNORE: BeamFlags =
        BeamFlags(Self::NULL_BEAM.0 | Self::MANUALLY_EDITED.0 | Self::FILTER_EDITED.0);

    pub fn contains(self, other: BeamFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: BeamFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: BeamFlags) {
        self.0 |= other.0;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Beam {
    pub depth: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal_depth: Option<f64>,
    /// Meters to starboard of the ping position.
    pub across_track: f64,
    /// Meters forward of the ping position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub along_track: Option<f64>,
    #[serde(default)]
    pub flags: BeamFlags,
}

impl Beam {
    /// The measured depth, falling back to the nominal depth when the measured
    /// value is zero.
    pub fn effective_depth(&self) -> f64 {
        if self.depth == 0.0 {
            self.nominal_depth.unwrap_or(0.0)
        } else {
            self.depth
        }
    }

    pub fn is_usable(&self) -> bool {
        self.effective_depth() != 0.0 && !self.flags.intersects(BeamFlags::IGNORE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ping {
    pub latitude: f64,
    pub longitude: f64,
    /// Degrees clockwise from north.
    pub heading: f64,
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub beams: Vec<Beam>,
}

impl Ping {
    pub fn is_valid(&self) -> bool {
        self.latitude <= 90.0 && self.longitude <= 180.0 && !self.ignore
    }
}

/// Processing note appended to a survey after it has been edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub program: String,
    pub command_line: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub version: u32,
    #[serde(default)]
    pub pings: Vec<Ping>,
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
}

impl Default for Survey {
    fn default() -> Self {
        Self {
            version: SURVEY_VERSION,
            pings: Vec::new(),
            history: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub enum SurveyError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    UnsupportedVersion(u32),
}

impl fmt::Display for SurveyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurveyError::Io(err) => write!(f, "survey io error: {err}"),
            SurveyError::Parse(err) => write!(f, "survey parse error: {err}"),
            SurveyError::UnsupportedVersion(version) => {
                write!(f, "unsupported survey version {version}")
            }
        }
    }
}

impl std::error::Error for SurveyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SurveyError::Io(err) => Some(err),
            SurveyError::Parse(err) => Some(err),
            SurveyError::UnsupportedVersion(_) => None,
        }
    }
}

impl From<std::io::Error> for SurveyError {
    fn from(err: std::io::Error) -> Self {
        SurveyError::Io(err)
    }
}

impl From<serde_json::Error> for SurveyError {
    fn from(err: serde_json::Error) -> Self {
        SurveyError::Parse(err)
    }
}

impl Survey {
    pub fn new(pings: Vec<Ping>) -> Self {
        Self {
            pings,
            ..Self::default()
        }
    }

    pub fn from_json(data: &[u8]) -> Result<Self, SurveyError> {
        let survey: Survey = serde_json::from_slice(data)?;
        if survey.version > SURVEY_VERSION {
            return Err(SurveyError::UnsupportedVersion(survey.version));
        }
        Ok(survey)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, SurveyError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, SurveyError> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    pub fn save(&self, path: &Path) -> Result<(), SurveyError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn filter_edited_count(&self) -> usize {
        self.pings
            .iter()
            .flat_map(|ping| ping.beams.iter())
            .filter(|beam| beam.flags.contains(BeamFlags::FILTER_EDITED))
            .count()
    }
}
