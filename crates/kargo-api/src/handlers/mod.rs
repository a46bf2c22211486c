//! HTTP request handlers

pub mod agency;
pub mod auth;
pub mod delivery;
pub mod group;
pub mod health;
pub mod search;
pub mod stats;
pub mod whatsapp;

use actix_web::HttpResponse;
use kargo_core::entities::common::Pagination;
use serde::Serialize;
use serde_json::json;

/// Success envelope: `{ success: true, data: … }`.
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": data,
    }))
}

/// Success envelope with a pagination block.
pub fn ok_paginated<T: Serialize>(rows: &[T], pagination: Pagination) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": rows,
        "pagination": pagination,
    }))
}
