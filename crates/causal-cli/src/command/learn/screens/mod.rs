pub use self::{home::HomeScreen, lesson::LessonScreen};

mod home;
mod lesson;
