pub mod account;
pub mod category;
pub mod course;
pub mod expense;
pub mod income;
pub mod onboarding;
pub mod profile;
pub mod response;
