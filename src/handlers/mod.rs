// handlers/mod.rs - HTTP handlers, one module per route group
//
// Routes are wired in main.rs; each group below maps to one `*_routes()`
// function there. Handlers stay thin: parse and validate the request, call
// a service, shape the JSON response.

pub mod auth;       // /auth/*, /register, /person/by-email
pub mod checkout;   // /checkout/* (proof-of-payment orders)
pub mod config;     // /config/churches
pub mod dashboard;  // /dashboard*
pub mod export;     // /export
pub mod meetings;   // /meetings
pub mod operations; // /operations/*
pub mod orders;     // /orders/* (PIX sales)
pub mod people;     // /people*, /person/:id
pub mod products;   // /products
