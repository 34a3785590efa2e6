pub mod chat;
pub mod itinerary;
pub mod place;
pub mod weather;
