//! Routing engine: expansion rooms and doors (§4.4), the destination-distance
//! heuristic (§4.5), the maze search itself (§4.6), connection pre-computation
//! and incomplete-connection discovery (§4.7, §4.8), and the batch pass
//! controller that drives them all (§4.9).

pub mod connection;
pub mod cost;
pub mod door;
pub mod drill;
pub mod heuristic;
pub mod incomplete;
pub mod maze;
pub mod mutation;
pub mod pass;
pub mod room;
pub mod stop;

pub use connection::{Connection, ConnectionId};
pub use cost::Control;
pub use door::{Door, DoorId, DoorKind};
pub use drill::{DrillPage, DrillPageCache, DrillSite};
pub use heuristic::{Heuristic, TargetPoint};
pub use incomplete::{find_incomplete, IncompleteConnection};
pub use maze::{MazeOutcome, MazeSearch, MazeSearchResult, PathPoint};
pub use pass::{batch_route, route_connection, BatchReport, Config, ConnectionResult, ConnectionStatus};
pub use room::{Room, RoomId, RoomKind, RoomState};
pub use stop::{Deadline, StopToken};
