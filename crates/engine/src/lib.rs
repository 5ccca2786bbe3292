//! Service layer for the marketplace: listing/alert/favorite/property-type
//! CRUD, alert matching, and the producer that fans a new listing out into
//! queued notification jobs.

pub mod alert;
pub mod favorite;
pub mod listing;
pub mod matcher;
pub mod producer;
pub mod property_type;
