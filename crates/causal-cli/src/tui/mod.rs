mod runtime;
mod screen;

pub use self::{
    runtime::run,
    screen::{Screen, ScreenStack, ScreenTransition},
};
