//! Downloader-level tests driven through a scripted engine.

mod lifecycle;
