//! Payload encoding and inbound command parsing.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::{CommandError, PublishError};

#[derive(Deserialize)]
struct PowerPayload {
    power: i64,
}

/// Parse a heater power command: a bare integer (`"40"`) or
/// `{"power": 40}`. Surrounding whitespace is ignored. The value is not
/// range-checked here.
pub fn parse_power_command(payload: &str) -> Result<i64, CommandError> {
    let text = payload.trim();
    if let Ok(n) = text.parse::<i64>() {
        return Ok(n);
    }
    if text.starts_with('{') {
        if let Ok(p) = serde_json::from_str::<PowerPayload>(text) {
            return Ok(p.power);
        }
    }
    Err(CommandError::Malformed)
}

/// Serialise `value` as JSON into a fixed-capacity string.
pub fn encode_json<T: Serialize, const N: usize>(value: &T) -> Result<String<N>, PublishError> {
    let json = serde_json::to_string(value).map_err(|_| PublishError::Encode)?;
    let mut out = String::new();
    out.push_str(&json).map_err(|()| PublishError::TooLarge)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_and_object_forms() {
        assert_eq!(parse_power_command("40"), Ok(40));
        assert_eq!(parse_power_command("  100\n"), Ok(100));
        assert_eq!(parse_power_command("{\"power\": 60}"), Ok(60));
        assert_eq!(parse_power_command(" {\"power\":0} "), Ok(0));
        // Range is checked by the controller, not the parser.
        assert_eq!(parse_power_command("50"), Ok(50));
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "forty", "40%", "{\"level\": 40}", "{\"power\": \"40\"}", "[40]", "4 0"] {
            assert_eq!(parse_power_command(bad), Err(CommandError::Malformed), "{bad:?}");
        }
    }

    #[test]
    fn encode_respects_capacity() {
        #[derive(Serialize)]
        struct Sample {
            value: f32,
            label: &'static str,
        }
        let p = Sample { value: f32::NAN, label: "kettle" };
        let s: String<64> = encode_json(&p).unwrap();
        assert_eq!(s.as_str(), r#"{"value":null,"label":"kettle"}"#);
        assert_eq!(encode_json::<_, 8>(&p), Err(PublishError::TooLarge));
    }
}
