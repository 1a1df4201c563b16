pub mod dispatch;
pub mod emissions;
pub mod geo;
pub mod inspect;
pub mod lines;
pub mod pf;
pub mod redistribute;
pub mod ts;
pub mod util;
