/// Soundex digit for a consonant; vowels and `Y` map to `0`, `H` and `W` to `None`.
const fn soundex_digit(c: u8) -> Option<u8> {
    match c {
        b'B' | b'F' | b'P' | b'V' => Some(b'1'),
        b'C' | b'G' | b'J' | b'K' | b'Q' | b'S' | b'X' | b'Z' => Some(b'2'),
        b'D' | b'T' => Some(b'3'),
        b'L' => Some(b'4'),
        b'M' | b'N' => Some(b'5'),
        b'R' => Some(b'6'),
        b'H' | b'W' => None,
        _ => Some(b'0'),
    }
}

/// American Soundex of the ASCII letters in `input`.
///
/// Returns an empty string when there are no ASCII letters.
///
/// ```
/// use sangkat::similarity::soundex;
/// assert_eq!(soundex("Robert"), "R163");
/// assert_eq!(soundex("Rupert"), "R163");
/// assert_eq!(soundex("ភ្នំ"), "");
/// ```
pub fn soundex(input: &str) -> String {
    let mut letters = input
        .bytes()
        .filter(u8::is_ascii_alphabetic)
        .map(|b| b.to_ascii_uppercase());

    let Some(first) = letters.next() else {
        return String::new();
    };

    let mut code = Vec::with_capacity(4);
    code.push(first);
    let mut last = soundex_digit(first);

    for letter in letters {
        if code.len() == 4 {
            break;
        }
        match soundex_digit(letter) {
            // H and W do not separate letters with the same code.
            None => {}
            Some(b'0') => last = Some(b'0'),
            Some(digit) => {
                if last != Some(digit) {
                    code.push(digit);
                }
                last = Some(digit);
            }
        }
    }
    code.resize(4, b'0');
    // Only ASCII uppercase letters and digits were pushed.
    String::from_utf8_lossy(&code).into_owned()
}
