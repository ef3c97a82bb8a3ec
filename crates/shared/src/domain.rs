use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(PostId);
id_newtype!(CommentId);
id_newtype!(SubforumId);

/// A viewer's directional preference on a post. Wire form is the raw integer
/// the backend stores: 1, 0, or -1; anything else is rejected at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum VoteStatus {
    Up,
    #[default]
    None,
    Down,
}

impl VoteStatus {
    /// Contribution of this status to the aggregate score.
    pub fn value(self) -> i64 {
        match self {
            VoteStatus::Up => 1,
            VoteStatus::None => 0,
            VoteStatus::Down => -1,
        }
    }
}

impl From<VoteStatus> for i8 {
    fn from(status: VoteStatus) -> Self {
        status.value() as i8
    }
}

impl TryFrom<i8> for VoteStatus {
    type Error = String;

    fn try_from(raw: i8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(VoteStatus::Up),
            0 => Ok(VoteStatus::None),
            -1 => Ok(VoteStatus::Down),
            other => Err(format!("vote status out of range: {other}")),
        }
    }
}

/// A requested vote action. Unlike [`VoteStatus`] there is no neutral
/// variant; "no vote" is only ever the result of a toggle, never a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn value(self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

impl From<VoteDirection> for i8 {
    fn from(direction: VoteDirection) -> Self {
        direction.value() as i8
    }
}

impl TryFrom<i8> for VoteDirection {
    type Error = String;

    fn try_from(raw: i8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(VoteDirection::Up),
            -1 => Ok(VoteDirection::Down),
            other => Err(format!("vote direction out of range: {other}")),
        }
    }
}

impl From<VoteDirection> for VoteStatus {
    fn from(direction: VoteDirection) -> Self {
        match direction {
            VoteDirection::Up => VoteStatus::Up,
            VoteDirection::Down => VoteStatus::Down,
        }
    }
}

/// Explicit signed-in identity. Constructed from a login response or CLI
/// arguments and passed by value wherever identity matters; the library
/// never stores a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub karma: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_status_round_trips_through_wire_integers() {
        for status in [VoteStatus::Up, VoteStatus::None, VoteStatus::Down] {
            let encoded = serde_json::to_string(&status).expect("encode");
            let decoded: VoteStatus = serde_json::from_str(&encoded).expect("decode");
            assert_eq!(decoded, status);
        }
        assert_eq!(serde_json::to_string(&VoteStatus::Down).expect("encode"), "-1");
    }

    #[test]
    fn out_of_range_vote_status_is_rejected() {
        let err = serde_json::from_str::<VoteStatus>("2").expect_err("must reject");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn vote_direction_has_no_neutral_variant() {
        assert!(serde_json::from_str::<VoteDirection>("0").is_err());
        assert_eq!(
            serde_json::from_str::<VoteDirection>("-1").expect("decode"),
            VoteDirection::Down
        );
    }
}
