//! Fan-in broadcasting: element-wise evaluation over multi-connection inputs.
//!
//! Every multi-input node follows the same policy:
//! - An empty input list is replaced by a single fallback element.
//! - Output length is the longest input length; length-1 inputs repeat their
//!   single element at every index.
//! - If several inputs are longer than 1 and their lengths disagree, the
//!   evaluation truncates to the shortest of those lengths.

use crate::error::GraphError;
use crate::model::pin_value::PinValue;

/// Run `op` element-wise across the given inputs. Each input is a resolved
/// fan-in list paired with the fallback used when the list is empty. `op`
/// receives one value per input for every output index.
pub fn broadcast<R, F>(
    inputs: &[(Vec<PinValue>, PinValue)],
    mut op: F,
) -> Result<Vec<R>, GraphError>
where
    F: FnMut(&[PinValue]) -> Result<R, GraphError>,
{
    let effective: Vec<&[PinValue]> = inputs
        .iter()
        .map(|(values, fallback)| {
            if values.is_empty() {
                std::slice::from_ref(fallback)
            } else {
                values.as_slice()
            }
        })
        .collect();

    let count = output_length(&effective);

    let mut results = Vec::with_capacity(count);
    let mut args: Vec<PinValue> = Vec::with_capacity(effective.len());
    for index in 0..count {
        args.clear();
        for values in &effective {
            let value = if values.len() == 1 {
                &values[0]
            } else {
                &values[index]
            };
            args.push(value.clone());
        }
        results.push(op(&args)?);
    }
    Ok(results)
}

fn output_length(inputs: &[&[PinValue]]) -> usize {
    let mut shortest_long: Option<usize> = None;
    for values in inputs {
        if values.len() > 1 {
            shortest_long = Some(match shortest_long {
                Some(current) => current.min(values.len()),
                None => values.len(),
            });
        }
    }
    shortest_long.unwrap_or(if inputs.is_empty() { 0 } else { 1 })
}

/// Collapse broadcast results into a single pin value: one element stays a
/// plain value, several become a `List`.
pub fn pack(mut values: Vec<PinValue>) -> PinValue {
    match values.len() {
        0 => PinValue::None,
        1 => values.remove(0),
        _ => PinValue::List(values),
    }
}
