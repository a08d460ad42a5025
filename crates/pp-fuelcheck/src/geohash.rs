//! Standard base32 geohash encoding.

pub const STATION_PRECISION: usize = 10;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Encode a coordinate as a geohash of `precision` characters.
///
/// Bits alternate longitude first, five bits per character.
pub fn encode(latitude: f64, longitude: f64, precision: usize) -> String {
    let mut lat = (-90.0_f64, 90.0_f64);
    let mut lon = (-180.0_f64, 180.0_f64);
    let mut out = String::with_capacity(precision);
    let mut even = true;
    let mut bit = 0u8;
    let mut idx = 0usize;

    while out.len() < precision {
        let (range, value) = if even {
            (&mut lon, longitude)
        } else {
            (&mut lat, latitude)
        };
        let mid = (range.0 + range.1) / 2.0;
        idx <<= 1;
        if value >= mid {
            idx |= 1;
            range.0 = mid;
        } else {
            range.1 = mid;
        }
        even = !even;

        bit += 1;
        if bit == 5 {
            out.push(BASE32[idx] as char);
            bit = 0;
            idx = 0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_reference_points() {
        assert_eq!(encode(57.64911, 10.40744, 10), "u4pruydqqv");
        assert_eq!(encode(0.0, 0.0, 5), "s0000");
    }

    #[test]
    fn sydney_cbd_prefix() {
        let g = encode(-33.8688, 151.2093, STATION_PRECISION);
        assert_eq!(g.len(), STATION_PRECISION);
        assert!(g.starts_with("r3gx2"));
    }
}
