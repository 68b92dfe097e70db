//! The remote operation contract.
//!
//! Every remotely invocable operation is declared exactly once in the table
//! at the bottom of this file. From that table the macro derives:
//!
//! - [`OpId`]: the enumerated operation id with its request/response names;
//! - [`Request`]: the typed request sum type, with record encode/decode;
//! - [`Control`] / [`Gameplay`]: the blocking contract;
//! - [`AsyncControl`] / [`AsyncGameplay`]: the callback contract;
//! - execution of a decoded request against any blocking implementation.
//!
//! Client bindings implement a single seam ([`Caller`] or [`AsyncCaller`]) and
//! receive the whole contract through blanket impls, so no binding restates
//! the operation list.
//!
//! The protocol does not deduplicate: retrying a non-idempotent operation
//! (`build`, `new_fleet`, ...) repeats its effect on the game.

use crate::error::{RpcError, RpcResult};
use crate::message::{Message, Record};
use crate::transport::Callback;
use crate::types::{
    BattleStatus, Blueprint, BuildingStatus, CombatStance, FleetStance, FleetStatus, Formation,
    GameStatus, PlanetStatus, PlayerStatus, Priority, ProductionStatus, ResearchStatus,
    ShipStatus, UnitStatus, Welcome,
};
use crate::wire::{Reply, WireValue};

/// Name of a batch request array.
pub const BATCH: &str = "BATCH";
/// Name of a batch response array.
pub const BATCH_RESPONSE: &str = "BATCH_RESPONSE";

/// Blocking seam: send one request, wait for its typed reply.
pub trait Caller {
    fn call<R: Reply>(&mut self, request: Request) -> RpcResult<R>;
}

/// Callback seam: issue one request, deliver its typed reply later.
pub trait AsyncCaller {
    fn call_async<R: Reply + Send + 'static>(&mut self, request: Request, callback: Callback<R>);
}

macro_rules! contract {
    (
        control {
            $(
                $(#[$cmeta:meta])*
                $cvariant:ident ($creq:literal => $cresp:literal)
                fn $cmethod:ident ( $( $carg:ident : $cty:ty ),* ) -> $cret:ty;
            )*
        }
        gameplay {
            $(
                $(#[$gmeta:meta])*
                $gvariant:ident ($greq:literal => $gresp:literal)
                fn $gmethod:ident ( $( $garg:ident : $gty:ty ),* ) -> $gret:ty;
            )*
        }
    ) => {
        /// Enumerated operation id.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum OpId {
            $( $cvariant, )*
            $( $gvariant, )*
        }

        impl OpId {
            pub const ALL: &'static [OpId] = &[
                $( OpId::$cvariant, )*
                $( OpId::$gvariant, )*
            ];

            /// Wire name of the request record.
            pub fn request_name(self) -> &'static str {
                match self {
                    $( OpId::$cvariant => $creq, )*
                    $( OpId::$gvariant => $greq, )*
                }
            }

            /// Wire name of the success response.
            pub fn response_name(self) -> &'static str {
                match self {
                    $( OpId::$cvariant => $cresp, )*
                    $( OpId::$gvariant => $gresp, )*
                }
            }

            pub fn from_request_name(name: &str) -> Option<OpId> {
                match name {
                    $( $creq => Some(OpId::$cvariant), )*
                    $( $greq => Some(OpId::$gvariant), )*
                    _ => None,
                }
            }

            /// Gameplay operations run behind the session's game guard.
            pub fn is_gameplay(self) -> bool {
                match self {
                    $( OpId::$cvariant => false, )*
                    $( OpId::$gvariant => true, )*
                }
            }
        }

        /// Session-level requests.
        #[derive(Debug, Clone, PartialEq)]
        pub enum ControlRequest {
            $( $cvariant { $( $carg: $cty ),* }, )*
        }

        /// Requests forwarded to the game engine.
        #[derive(Debug, Clone, PartialEq)]
        pub enum GameplayRequest {
            $( $gvariant { $( $garg: $gty ),* }, )*
        }

        impl ControlRequest {
            pub fn op(&self) -> OpId {
                match self {
                    $( ControlRequest::$cvariant { .. } => OpId::$cvariant, )*
                }
            }

            pub fn execute<T: Control + ?Sized>(self, target: &mut T) -> RpcResult<Message> {
                match self {
                    $(
                        ControlRequest::$cvariant { $( $carg ),* } => {
                            let reply = target.$cmethod($( $carg ),*)?;
                            Ok(Reply::into_reply(reply, $cresp))
                        }
                    )*
                }
            }
        }

        impl GameplayRequest {
            pub fn op(&self) -> OpId {
                match self {
                    $( GameplayRequest::$gvariant { .. } => OpId::$gvariant, )*
                }
            }

            pub fn execute<T: Gameplay + ?Sized>(self, target: &mut T) -> RpcResult<Message> {
                match self {
                    $(
                        GameplayRequest::$gvariant { $( $garg ),* } => {
                            let reply = target.$gmethod($( $garg ),*)?;
                            Ok(Reply::into_reply(reply, $gresp))
                        }
                    )*
                }
            }
        }

        impl Request {
            /// Encode as a request record named after the operation.
            pub fn to_record(&self) -> Record {
                match self {
                    $(
                        Request::Control(ControlRequest::$cvariant { $( $carg ),* }) => {
                            Record::new($creq)
                                $( .with(stringify!($carg), WireValue::to_value($carg)) )*
                        }
                    )*
                    $(
                        Request::Gameplay(GameplayRequest::$gvariant { $( $garg ),* }) => {
                            Record::new($greq)
                                $( .with(stringify!($garg), WireValue::to_value($garg)) )*
                        }
                    )*
                }
            }

            /// Decode a request record. Unknown names are `UNKNOWN_MESSAGE`,
            /// absent or mistyped arguments are `FORMAT`.
            pub fn from_record(record: &Record) -> RpcResult<Request> {
                let op = OpId::from_request_name(record.name())
                    .ok_or_else(|| RpcError::unknown_message(record.name()))?;
                let request = match op {
                    $(
                        OpId::$cvariant => Request::Control(ControlRequest::$cvariant {
                            $( $carg: record.get::<$cty>(stringify!($carg))?, )*
                        }),
                    )*
                    $(
                        OpId::$gvariant => Request::Gameplay(GameplayRequest::$gvariant {
                            $( $garg: record.get::<$gty>(stringify!($garg))?, )*
                        }),
                    )*
                };
                Ok(request)
            }
        }

        /// Session operations of the blocking contract.
        pub trait Control {
            $(
                $(#[$cmeta])*
                fn $cmethod(&mut self $(, $carg: $cty )*) -> RpcResult<$cret>;
            )*
        }

        /// Game operations of the blocking contract.
        pub trait Gameplay {
            $(
                $(#[$gmeta])*
                fn $gmethod(&mut self $(, $garg: $gty )*) -> RpcResult<$gret>;
            )*
        }

        /// Session operations of the callback contract.
        pub trait AsyncControl {
            $(
                $(#[$cmeta])*
                fn $cmethod(&mut self $(, $carg: $cty )*, callback: Callback<$cret>);
            )*
        }

        /// Game operations of the callback contract.
        pub trait AsyncGameplay {
            $(
                $(#[$gmeta])*
                fn $gmethod(&mut self $(, $garg: $gty )*, callback: Callback<$gret>);
            )*
        }

        impl<C: Caller> Control for C {
            $(
                fn $cmethod(&mut self $(, $carg: $cty )*) -> RpcResult<$cret> {
                    Caller::call(self, Request::Control(ControlRequest::$cvariant { $( $carg ),* }))
                }
            )*
        }

        impl<C: Caller> Gameplay for C {
            $(
                fn $gmethod(&mut self $(, $garg: $gty )*) -> RpcResult<$gret> {
                    Caller::call(self, Request::Gameplay(GameplayRequest::$gvariant { $( $garg ),* }))
                }
            )*
        }

        impl<C: AsyncCaller> AsyncControl for C {
            $(
                fn $cmethod(&mut self $(, $carg: $cty )*, callback: Callback<$cret>) {
                    AsyncCaller::call_async(
                        self,
                        Request::Control(ControlRequest::$cvariant { $( $carg ),* }),
                        callback,
                    )
                }
            )*
        }

        impl<C: AsyncCaller> AsyncGameplay for C {
            $(
                fn $gmethod(&mut self $(, $garg: $gty )*, callback: Callback<$gret>) {
                    AsyncCaller::call_async(
                        self,
                        Request::Gameplay(GameplayRequest::$gvariant { $( $garg ),* }),
                        callback,
                    )
                }
            )*
        }
    };
}

/// A decoded request, strongly typed right after the name lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Control(ControlRequest),
    Gameplay(GameplayRequest),
}

impl Request {
    pub fn op(&self) -> OpId {
        match self {
            Request::Control(request) => request.op(),
            Request::Gameplay(request) => request.op(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.op().request_name()
    }

    /// Run against a full blocking implementation and shape the reply.
    pub fn execute<T: Control + Gameplay + ?Sized>(self, target: &mut T) -> RpcResult<Message> {
        match self {
            Request::Control(request) => request.execute(target),
            Request::Gameplay(request) => request.execute(target),
        }
    }
}

contract! {
    control {
        Ping("PING" => "PONG")
        fn ping() -> ();

        /// Authenticate and mint a session token.
        Login("LOGIN" => "WELCOME")
        fn login(user: String, passphrase: String, protocol_version: String) -> Welcome;

        /// Re-bind this connection to an existing session token.
        Relogin("RELOGIN" => "WELCOME_BACK")
        fn relogin(session: String) -> ();

        Leave("LEAVE" => "OK")
        fn leave() -> ();
    }

    gameplay {
        GetGame("GET_GAME" => "GAME")
        fn get_game() -> GameStatus;

        GetPlayer("GET_PLAYER" => "PLAYER")
        fn get_player(name: String) -> PlayerStatus;

        ListPlayers("LIST_PLAYERS" => "PLAYERS")
        fn list_players() -> Vec<PlayerStatus>;

        GetTurn("GET_TURN" => "TURN")
        fn get_turn() -> i64;

        EndTurn("END_TURN" => "OK")
        fn end_turn() -> ();

        GetCredits("GET_CREDITS" => "CREDITS")
        fn get_credits() -> i64;

        Surrender("SURRENDER" => "OK")
        fn surrender() -> ();

        SendChat("SEND_CHAT" => "OK")
        fn send_chat(to: String, text: String) -> ();

        /// Form a new fleet at `planet` from the given ship ids.
        NewFleet("NEW_FLEET" => "FLEET")
        fn new_fleet(planet: String, ships: Vec<i64>) -> FleetStatus;

        GetFleet("GET_FLEET" => "FLEET")
        fn get_fleet(fleet: i64) -> FleetStatus;

        ListFleets("LIST_FLEETS" => "FLEETS")
        fn list_fleets() -> Vec<FleetStatus>;

        ListFleetsAt("LIST_FLEETS_AT" => "FLEETS")
        fn list_fleets_at(planet: String) -> Vec<FleetStatus>;

        MoveFleet("MOVE_FLEET" => "OK")
        fn move_fleet(fleet: i64, x: i32, y: i32) -> ();

        MoveFleetToPlanet("MOVE_FLEET_TO_PLANET" => "OK")
        fn move_fleet_to_planet(fleet: i64, planet: String) -> ();

        StopFleet("STOP_FLEET" => "OK")
        fn stop_fleet(fleet: i64) -> ();

        RenameFleet("RENAME_FLEET" => "OK")
        fn rename_fleet(fleet: i64, name: String) -> ();

        MergeFleets("MERGE_FLEETS" => "FLEET")
        fn merge_fleets(fleet: i64, other: i64) -> FleetStatus;

        SplitFleet("SPLIT_FLEET" => "FLEET")
        fn split_fleet(fleet: i64, ships: Vec<i64>) -> FleetStatus;

        DisbandFleet("DISBAND_FLEET" => "OK")
        fn disband_fleet(fleet: i64) -> ();

        SetFleetStance("SET_FLEET_STANCE" => "OK")
        fn set_fleet_stance(fleet: i64, stance: FleetStance) -> ();

        ColonizePlanet("COLONIZE_PLANET" => "OK")
        fn colonize_planet(fleet: i64, planet: String) -> ();

        InvadePlanet("INVADE_PLANET" => "OK")
        fn invade_planet(fleet: i64, planet: String) -> ();

        BombardPlanet("BOMBARD_PLANET" => "OK")
        fn bombard_planet(fleet: i64, planet: String) -> ();

        /// Loop the fleet through the named planets.
        SetPatrol("SET_PATROL" => "OK")
        fn set_patrol(fleet: i64, waypoints: Vec<String>) -> ();

        GetFleetEta("GET_FLEET_ETA" => "ETA")
        fn get_fleet_eta(fleet: i64) -> i64;

        ListShips("LIST_SHIPS" => "SHIPS")
        fn list_ships(fleet: i64) -> Vec<ShipStatus>;

        GetShip("GET_SHIP" => "SHIP")
        fn get_ship(ship: i64) -> ShipStatus;

        TransferShip("TRANSFER_SHIP" => "OK")
        fn transfer_ship(ship: i64, fleet: i64) -> ();

        ScrapShip("SCRAP_SHIP" => "OK")
        fn scrap_ship(ship: i64) -> ();

        RepairShip("REPAIR_SHIP" => "OK")
        fn repair_ship(ship: i64) -> ();

        UpgradeShip("UPGRADE_SHIP" => "OK")
        fn upgrade_ship(ship: i64, module: String) -> ();

        GetPlanet("GET_PLANET" => "PLANET")
        fn get_planet(planet: String) -> PlanetStatus;

        ListPlanets("LIST_PLANETS" => "PLANETS")
        fn list_planets() -> Vec<PlanetStatus>;

        ListOwnPlanets("LIST_OWN_PLANETS" => "PLANETS")
        fn list_own_planets() -> Vec<PlanetStatus>;

        RenamePlanet("RENAME_PLANET" => "OK")
        fn rename_planet(planet: String, name: String) -> ();

        SetTaxRate("SET_TAX_RATE" => "OK")
        fn set_tax_rate(planet: String, rate: i32) -> ();

        AbandonPlanet("ABANDON_PLANET" => "OK")
        fn abandon_planet(planet: String) -> ();

        ScanPlanet("SCAN_PLANET" => "PLANET")
        fn scan_planet(planet: String) -> PlanetStatus;

        GetPlanetDefense("GET_PLANET_DEFENSE" => "DEFENSE")
        fn get_planet_defense(planet: String) -> i64;

        Build("BUILD" => "BUILDING")
        fn build(planet: String, kind: String) -> BuildingStatus;

        GetBuilding("GET_BUILDING" => "BUILDING")
        fn get_building(building: i64) -> BuildingStatus;

        ListBuildings("LIST_BUILDINGS" => "BUILDINGS")
        fn list_buildings(planet: String) -> Vec<BuildingStatus>;

        UpgradeBuilding("UPGRADE_BUILDING" => "OK")
        fn upgrade_building(building: i64) -> ();

        DemolishBuilding("DEMOLISH_BUILDING" => "OK")
        fn demolish_building(building: i64) -> ();

        EnableBuilding("ENABLE_BUILDING" => "OK")
        fn enable_building(building: i64) -> ();

        DisableBuilding("DISABLE_BUILDING" => "OK")
        fn disable_building(building: i64) -> ();

        CancelConstruction("CANCEL_CONSTRUCTION" => "OK")
        fn cancel_construction(building: i64) -> ();

        /// Finish construction now; returns the credits spent.
        RushBuilding("RUSH_BUILDING" => "COST")
        fn rush_building(building: i64) -> i64;

        Produce("PRODUCE" => "PRODUCTION")
        fn produce(planet: String, item: String, quantity: i32) -> ProductionStatus;

        GetProduction("GET_PRODUCTION" => "PRODUCTION")
        fn get_production(order: i64) -> ProductionStatus;

        ListProduction("LIST_PRODUCTION" => "PRODUCTIONS")
        fn list_production(planet: String) -> Vec<ProductionStatus>;

        CancelProduction("CANCEL_PRODUCTION" => "OK")
        fn cancel_production(order: i64) -> ();

        SetProductionPriority("SET_PRODUCTION_PRIORITY" => "OK")
        fn set_production_priority(order: i64, priority: Priority) -> ();

        /// Move an order to `position` in its planet's queue.
        ReorderProduction("REORDER_PRODUCTION" => "OK")
        fn reorder_production(order: i64, position: i32) -> ();

        RushProduction("RUSH_PRODUCTION" => "COST")
        fn rush_production(order: i64) -> i64;

        ListBlueprints("LIST_BLUEPRINTS" => "BLUEPRINTS")
        fn list_blueprints(planet: String) -> Vec<Blueprint>;

        StartResearch("START_RESEARCH" => "RESEARCH")
        fn start_research(topic: String) -> ResearchStatus;

        GetResearch("GET_RESEARCH" => "RESEARCH")
        fn get_research(topic: String) -> ResearchStatus;

        ListResearch("LIST_RESEARCH" => "RESEARCH_LIST")
        fn list_research() -> Vec<ResearchStatus>;

        CancelResearch("CANCEL_RESEARCH" => "OK")
        fn cancel_research(topic: String) -> ();

        /// Share of income spent on research, in percent.
        SetResearchBudget("SET_RESEARCH_BUDGET" => "OK")
        fn set_research_budget(percent: i32) -> ();

        GetResearchBudget("GET_RESEARCH_BUDGET" => "BUDGET")
        fn get_research_budget() -> i64;

        ListUnits("LIST_UNITS" => "UNITS")
        fn list_units(battle: i64) -> Vec<UnitStatus>;

        GetUnit("GET_UNIT" => "UNIT")
        fn get_unit(unit: i64) -> UnitStatus;

        MoveUnit("MOVE_UNIT" => "OK")
        fn move_unit(unit: i64, x: i32, y: i32) -> ();

        AttackUnit("ATTACK_UNIT" => "OK")
        fn attack_unit(unit: i64, target: i64) -> ();

        AttackPosition("ATTACK_POSITION" => "OK")
        fn attack_position(unit: i64, x: i32, y: i32) -> ();

        HoldUnit("HOLD_UNIT" => "OK")
        fn hold_unit(unit: i64) -> ();

        RetreatUnit("RETREAT_UNIT" => "OK")
        fn retreat_unit(unit: i64) -> ();

        SetUnitStance("SET_UNIT_STANCE" => "OK")
        fn set_unit_stance(unit: i64, stance: CombatStance) -> ();

        SetFormation("SET_FORMATION" => "OK")
        fn set_formation(battle: i64, formation: Formation) -> ();

        UseAbility("USE_ABILITY" => "OK")
        fn use_ability(unit: i64, ability: String, target: i64) -> ();

        ListBattles("LIST_BATTLES" => "BATTLES")
        fn list_battles() -> Vec<BattleStatus>;

        GetBattle("GET_BATTLE" => "BATTLE")
        fn get_battle(battle: i64) -> BattleStatus;

        JoinBattle("JOIN_BATTLE" => "OK")
        fn join_battle(battle: i64, fleet: i64) -> ();

        RetreatFromBattle("RETREAT_FROM_BATTLE" => "OK")
        fn retreat_from_battle(battle: i64) -> ();

        EndCombatTurn("END_COMBAT_TURN" => "OK")
        fn end_combat_turn(battle: i64) -> ();

        AutoResolveBattle("AUTO_RESOLVE_BATTLE" => "BATTLE")
        fn auto_resolve_battle(battle: i64) -> BattleStatus;

        GetBattleRound("GET_BATTLE_ROUND" => "ROUND")
        fn get_battle_round(battle: i64) -> i64;

        IsBattleFinished("IS_BATTLE_FINISHED" => "FINISHED")
        fn is_battle_finished(battle: i64) -> bool;
    }
}
