//! Browser bindings: layout and PDF export for a page that hands images over as data URIs.

use chrono::NaiveDate;
use wasm_bindgen::prelude::*;

use crate::export::{output_filename_at, ExportJob};
use crate::model::LayoutRequest;

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Lay out a `LayoutRequest` object; returns a `LayoutResult` object.
#[wasm_bindgen]
pub fn layout_json(request: JsValue) -> Result<JsValue, JsValue> {
    let request: LayoutRequest = serde_wasm_bindgen::from_value(request)?;
    let result = crate::layout(&request).map_err(js_error)?;
    Ok(serde_wasm_bindgen::to_value(&result)?)
}

/// Render an `ExportJob` object whose images are data URIs.
#[wasm_bindgen]
pub fn export_pdf(job: JsValue) -> Result<Vec<u8>, JsValue> {
    let job: ExportJob = serde_wasm_bindgen::from_value(job)?;
    crate::render(&job).map_err(js_error)
}

/// Download name for an export started now, from the browser clock.
#[wasm_bindgen]
pub fn output_filename() -> String {
    let now = js_sys::Date::new_0();
    let at = NaiveDate::from_ymd_opt(now.get_full_year() as i32, now.get_month() + 1, now.get_date())
        .and_then(|d| d.and_hms_opt(now.get_hours(), now.get_minutes(), now.get_seconds()))
        .unwrap_or_default();
    output_filename_at(at)
}
