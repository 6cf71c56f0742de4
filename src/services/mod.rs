// Checkout and order history
pub mod orders;

// Payment confirmation and the card processor client
pub mod payments;
pub mod stripe;

// Back-office reporting
pub mod analytics;
