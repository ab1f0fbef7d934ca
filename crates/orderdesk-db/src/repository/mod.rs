//! # Repository Module
//!
//! Database repository implementations for OrderDesk.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Request handler                                                       │
//! │       │                                                                 │
//! │       │  db.orders().list(&filter)                                     │
//! │       ▼                                                                 │
//! │  OrderRepository                  UserRepository                       │
//! │  ├── create(NewOrder)             ├── create(NewUser)                  │
//! │  ├── get_by_id(id)                ├── authenticate(email, password)    │
//! │  ├── update_items(id, ..)         ├── change_password(id, ..)          │
//! │  ├── set_status(id, status)       ├── set_active(id, active)           │
//! │  ├── list(&filter)                ├── screens_for_profile(profile)     │
//! │  └── filtered_net_total(&filter)  └── grant_screen(profile, screen)    │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`OrderRepository`](order::OrderRepository) - Priced orders and the order list
//! - [`UserRepository`](user::UserRepository) - Accounts, sign-in, screen allow-list

pub mod order;
pub mod user;
