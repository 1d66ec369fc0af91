pub mod artefacts;
pub mod definitions;
pub mod model;
pub mod train_input;
pub mod training_session;

pub use self::artefacts::*;
pub use self::definitions::*;
pub use self::model::*;
pub use self::train_input::*;
pub use self::training_session::*;
