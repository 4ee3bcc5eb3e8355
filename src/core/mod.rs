// ─── ModSync Core ───
// Keeps the mods a user is subscribed to downloaded and installed for one game.
//
// Architecture:
//   core/
//     model/       Games, mods, mod files, target platforms
//     api/         ModSource trait + REST client with pagination
//     downloader/  Concurrent streaming downloads with size checks
//     installer/   Zip extraction, content-folder selection, copy into mods dir
//     storage/     Persisted record of downloads and installations
//     sync/        One sync cycle per game
//     state/       Context built from the config
//     config       config.json
//     http         Shared HTTP client
//     fs_utils     Delete and recursive-copy helpers

pub mod api;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fs_utils;
pub mod http;
pub mod installer;
pub mod model;
pub mod state;
pub mod storage;
pub mod sync;
