fn random_u32() -> u32 {
    (js_sys::Math::random() * (u32::MAX as f64 + 1.0)) as u32
}

pub fn make_stroke_id() -> String {
    let now = js_sys::Date::now() as u64;
    format!("{now:x}-{:08x}", random_u32())
}
