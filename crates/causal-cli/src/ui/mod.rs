pub mod captions;
pub mod widgets;
