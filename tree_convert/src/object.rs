use crate::errors::ConvertError;
use serde::Serialize;
use serde_json::Value;

/// Convert any serializable value into plain JSON maps and arrays
///
/// Structs and maps become objects, sequences become arrays and scalars are
/// kept as they are. Applying it to its own output changes nothing.
///
/// The value must be finite: serializing a cyclic graph (for example an
/// `Rc<RefCell<_>>` cycle) does not terminate.
pub fn object_to_array<T>(value: &T) -> Result<Value, ConvertError>
where
    T: Serialize + ?Sized,
{
    Ok(serde_json::to_value(value)?)
}
