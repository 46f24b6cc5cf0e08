//! Move sequences and the move file they are loaded from.
//!
//! One move per line: `<index> <q1> .. <q7> <move_time>`, whitespace
//! separated. Blank lines and lines starting with `#` are skipped. A line that
//! does not parse is dropped as a whole.

use std::fmt;
use std::path::{Path, PathBuf};

use kinematics::{InvalidMoveError, JOINT_COUNT, JointConfiguration};
use log::{info, warn};
use thiserror::Error;

/// A pose to reach and how long the move there should take.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Move {
    index: i32,
    target: JointConfiguration,
    desired_duration: f64,
}

impl Move {
    pub fn new(index: i32, target: JointConfiguration, desired_duration: f64) -> Result<Self, InvalidMoveError> {
        if !desired_duration.is_finite() || desired_duration <= 0.0 {
            return Err(InvalidMoveError::NonPositiveDuration(desired_duration));
        }
        if let Some(axis) = target.first_non_finite() {
            return Err(InvalidMoveError::NonFiniteJoint { which: "target", axis });
        }
        Ok(Self {
            index,
            target,
            desired_duration,
        })
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn target(&self) -> &JointConfiguration {
        &self.target
    }

    /// Requested duration in seconds.
    pub fn desired_duration(&self) -> f64 {
        self.desired_duration
    }
}

/// Non-empty, cyclic list of moves.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveSequence {
    moves: Vec<Move>,
}

impl MoveSequence {
    pub fn new(moves: Vec<Move>) -> Result<Self, ConfigParseError> {
        if moves.is_empty() {
            return Err(ConfigParseError::NoValidMoves);
        }
        Ok(Self { moves })
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Always false for a constructed sequence.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn first(&self) -> &Move {
        &self.moves[0]
    }

    pub fn get(&self, position: usize) -> Option<&Move> {
        self.moves.get(position)
    }

    /// Position that follows `position`, wrapping to the start.
    pub fn next_position(&self, position: usize) -> usize {
        (position + 1) % self.moves.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Move> {
        self.moves.iter()
    }

    /// The `(from, to)` pairs of one full pass, ending back at the first move.
    pub fn transitions(&self) -> impl Iterator<Item = (&Move, &Move)> {
        (0..self.moves.len()).map(move |i| (&self.moves[i], &self.moves[self.next_position(i)]))
    }
}

/// Why a single line was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineError {
    #[error("missing {0}")]
    MissingField(Field),
    #[error("cannot parse {field} from {token:?}")]
    BadNumber { field: Field, token: String },
    #[error("unexpected trailing field {0:?}")]
    TrailingField(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Index,
    Joint(usize),
    MoveTime,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Index => write!(f, "move index"),
            Field::Joint(axis) => write!(f, "joint {}", axis + 1),
            Field::MoveTime => write!(f, "move time"),
        }
    }
}

/// Loading the move file failed; the run cannot start.
#[derive(Debug, Error)]
pub enum ConfigParseError {
    #[error("failed to read move file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no valid moves found in move file")]
    NoValidMoves,
    #[error("line {line}: {source}")]
    InvalidMove {
        line: usize,
        #[source]
        source: InvalidMoveError,
    },
}

/// Numbers parsed from a data line, before the move itself is validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMove {
    pub index: i32,
    pub joints: [f64; JOINT_COUNT],
    pub move_time: f64,
}

impl RawMove {
    pub fn into_move(self) -> Result<Move, InvalidMoveError> {
        Move::new(self.index, JointConfiguration::new(self.joints), self.move_time)
    }
}

fn parse_field<'a, T: std::str::FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    field: Field,
) -> Result<T, LineError> {
    let token = tokens.next().ok_or(LineError::MissingField(field))?;
    token.parse().map_err(|_| LineError::BadNumber {
        field,
        token: token.to_string(),
    })
}

/// Parses the numbers of one data line. Every field must be present and
/// numeric, and nothing may follow the move time.
pub fn parse_line(line: &str) -> Result<RawMove, LineError> {
    let mut tokens = line.split_whitespace();

    let index = parse_field(&mut tokens, Field::Index)?;
    let mut joints = [0.0; JOINT_COUNT];
    for (axis, joint) in joints.iter_mut().enumerate() {
        *joint = parse_field(&mut tokens, Field::Joint(axis))?;
    }
    let move_time = parse_field(&mut tokens, Field::MoveTime)?;

    if let Some(extra) = tokens.next() {
        return Err(LineError::TrailingField(extra.to_string()));
    }

    Ok(RawMove {
        index,
        joints,
        move_time,
    })
}

/// Parses a whole move file.
///
/// Malformed lines are logged and skipped. A well-formed line describing an
/// impossible move (non-positive time, non-finite joint) fails the load.
pub fn parse_moves(contents: &str) -> Result<MoveSequence, ConfigParseError> {
    let mut moves = Vec::new();

    for (number, line) in contents.lines().enumerate() {
        let line_number = number + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let raw = match parse_line(trimmed) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Discarding line {}: {} in {:?}", line_number, e, trimmed);
                continue;
            }
        };

        let dance_move = raw.into_move().map_err(|source| ConfigParseError::InvalidMove {
            line: line_number,
            source,
        })?;
        info!(
            "Loaded move {} with move time {}s",
            dance_move.index(),
            dance_move.desired_duration()
        );
        moves.push(dance_move);
    }

    MoveSequence::new(moves)
}

pub fn load_moves(path: impl AsRef<Path>) -> Result<MoveSequence, ConfigParseError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_moves(&contents)
}
