use plantdb_store::Defaulted;

use crate::types::DerivedJson;
use crate::util::{open_store, print_json};

pub(crate) fn cmd_kc(root: &str, id: u16, day: u16, json: bool) -> anyhow::Result<()> {
    let ctx = open_store(root)?;
    report(id, day, "kc", ctx.store.crop_coefficient(id, day), json)
}

pub(crate) fn cmd_root_depth(root: &str, id: u16, day: u16, json: bool) -> anyhow::Result<()> {
    let ctx = open_store(root)?;
    report(id, day, "root depth (mm)", ctx.store.root_depth_mm(id, day), json)
}

// A defaulted value is still printed; the cause goes to stderr.
fn report(
    plant_id: u16,
    day: u16,
    label: &str,
    result: Result<f32, Defaulted>,
    json: bool,
) -> anyhow::Result<()> {
    let (value, cause) = match result {
        Ok(value) => (value, None),
        Err(Defaulted { value, cause }) => (value, Some(cause)),
    };
    if json {
        return print_json(&DerivedJson {
            plant_id,
            day,
            value,
            defaulted: cause.is_some(),
            code: cause.as_ref().map_or(0, |e| e.code().as_u8()),
            reason: cause.map(|e| e.to_string()),
        });
    }
    if let Some(cause) = cause {
        eprintln!("warning: plant {plant_id}: {cause}; using default");
    }
    println!("plant {plant_id} day {day}: {label} = {value:.3}");
    Ok(())
}
