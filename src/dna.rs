// IUPAC complement, see https://www.bioinformatics.org/sms/iupac.html
fn comp(base: &u8) -> u8 {
    let upper = match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'T' | b'U' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        b'Y' => b'R',
        b'R' => b'Y',
        b'K' => b'M',
        b'M' => b'K',
        b'D' => b'H',
        b'H' => b'D',
        b'V' => b'B',
        b'B' => b'V',
        b'W' | b'S' | b'N' => base.to_ascii_uppercase(),
        _ => return *base,
    };
    if base.is_ascii_lowercase() {
        upper.to_ascii_lowercase()
    } else {
        upper
    }
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(comp).collect()
}

/// Sequence as written to the output files
pub fn to_text(seq: &[u8]) -> String {
    String::from_utf8_lossy(seq).to_ascii_uppercase()
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn test_revcomp() {
        assert_eq!(b"gAtCnN"[..], revcomp(b"NnGaTc"));
        assert_eq!(b"ymkr-"[..], revcomp(b"-ymkr"));
    }

    #[test]
    fn test_to_text() {
        assert_eq!(to_text(b"acgtn"), "ACGTN");
    }
}
