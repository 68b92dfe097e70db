//! Small value types and status snapshots exchanged by contract operations.
//!
//! Enumerated modes travel as upper-case strings; snapshots travel as records
//! named after the snapshot (`FLEET`, `PLANET`, ...), with one field per
//! struct field.

use crate::error::RpcResult;
use crate::message::{Message, MessageError, Record, Value};
use crate::wire::{expect_record, Reply, Snapshot, WireValue};

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $wire:literal ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $wire ),*
                }
            }
        }

        impl WireValue for $name {
            const KIND: &'static str = stringify!($name);

            fn to_value(&self) -> Value {
                Value::Str(self.as_str().to_string())
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::Str(s) => $name::ALL.iter().copied().find(|v| v.as_str() == s.as_str()),
                    _ => None,
                }
            }
        }
    };
}

macro_rules! snapshot {
    (
        $(#[$meta:meta])*
        pub struct $name:ident = $wire:literal {
            $( $(#[$fmeta:meta])* pub $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: $ty ),*
        }

        impl Snapshot for $name {
            const NAME: &'static str = $wire;

            fn to_record(&self) -> Record {
                Record::new($wire)
                    $( .with(stringify!($field), WireValue::to_value(&self.$field)) )*
            }

            fn from_record(record: &Record) -> Result<Self, MessageError> {
                Ok(Self {
                    $( $field: record.get::<$ty>(stringify!($field))?, )*
                })
            }
        }

        impl WireValue for $name {
            const KIND: &'static str = $wire;

            fn to_value(&self) -> Value {
                Value::Record(self.to_record())
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::Record(record) if record.is($wire) => Self::from_record(record).ok(),
                    _ => None,
                }
            }
        }

        impl Reply for $name {
            fn into_reply(self, name: &str) -> Message {
                let mut record = self.to_record();
                record.rename(name);
                Message::Record(record)
            }

            fn from_reply(message: Message, name: &str) -> RpcResult<Self> {
                let record = expect_record(message, name)?;
                Ok(Self::from_record(&record)?)
            }
        }
    };
}

wire_enum! {
    /// Engagement rule of a fleet outside battle.
    pub enum FleetStance {
        Passive = "PASSIVE",
        Defensive = "DEFENSIVE",
        Aggressive = "AGGRESSIVE",
    }
}

wire_enum! {
    pub enum Priority {
        Low = "LOW",
        Normal = "NORMAL",
        High = "HIGH",
        Urgent = "URGENT",
    }
}

wire_enum! {
    /// Per-unit behaviour inside a battle.
    pub enum CombatStance {
        Hold = "HOLD",
        Advance = "ADVANCE",
        Retreat = "RETREAT",
        Flank = "FLANK",
    }
}

wire_enum! {
    pub enum Formation {
        Line = "LINE",
        Wedge = "WEDGE",
        Sphere = "SPHERE",
        Scattered = "SCATTERED",
    }
}

snapshot! {
    /// Reply to a successful login.
    pub struct Welcome = "WELCOME" {
        pub session_id: String,
    }
}

snapshot! {
    pub struct Position = "POSITION" {
        pub x: i32,
        pub y: i32,
    }
}

snapshot! {
    pub struct GameStatus = "GAME" {
        pub name: String,
        pub turn: i64,
        pub phase: String,
        pub players: Vec<String>,
    }
}

snapshot! {
    pub struct PlayerStatus = "PLAYER" {
        pub name: String,
        pub credits: i64,
        pub score: i64,
        pub planets: i64,
        pub alive: bool,
    }
}

snapshot! {
    pub struct FleetStatus = "FLEET" {
        pub id: i64,
        pub owner: String,
        pub name: String,
        pub position: Position,
        /// Ship ids, in fleet order.
        pub ships: Vec<i64>,
        pub stance: FleetStance,
        pub moving: bool,
    }
}

snapshot! {
    pub struct ShipStatus = "SHIP" {
        pub id: i64,
        pub fleet: i64,
        pub class: String,
        pub hull: i64,
        pub max_hull: i64,
    }
}

snapshot! {
    pub struct PlanetStatus = "PLANET" {
        pub name: String,
        /// Empty when unclaimed.
        pub owner: String,
        pub position: Position,
        pub population: i64,
        pub tax_rate: i32,
        pub defense: i64,
    }
}

snapshot! {
    pub struct BuildingStatus = "BUILDING" {
        pub id: i64,
        pub planet: String,
        pub kind: String,
        pub level: i32,
        /// Construction progress in percent.
        pub progress: i32,
        pub active: bool,
    }
}

snapshot! {
    pub struct ProductionStatus = "PRODUCTION" {
        pub id: i64,
        pub planet: String,
        pub item: String,
        pub quantity: i32,
        pub progress: i32,
        pub priority: Priority,
    }
}

snapshot! {
    pub struct Blueprint = "BLUEPRINT" {
        pub item: String,
        pub cost: i64,
        pub turns: i32,
    }
}

snapshot! {
    pub struct ResearchStatus = "RESEARCH" {
        pub topic: String,
        pub level: i32,
        pub progress: i32,
        pub active: bool,
    }
}

snapshot! {
    pub struct UnitStatus = "UNIT" {
        pub id: i64,
        pub battle: i64,
        pub owner: String,
        pub kind: String,
        pub health: i64,
        pub position: Position,
        pub stance: CombatStance,
    }
}

snapshot! {
    pub struct BattleStatus = "BATTLE" {
        pub id: i64,
        pub round: i64,
        pub position: Position,
        pub sides: Vec<String>,
        pub finished: bool,
        /// Empty while the battle is undecided.
        pub winner: String,
    }
}
