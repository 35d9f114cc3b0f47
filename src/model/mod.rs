pub mod collection;
pub mod field;
pub mod param;
pub mod season;

pub use collection::{Collection, Registry};
pub use field::{EncodeContext, Field, FieldKind, FieldValues, PlayerIndex};
pub use param::{Param, ParamMap, ParamValue, QueryArgs};
pub use season::SeasonDates;
