//! Bundled sample programs.

/// `(key, source)` pairs, in menu order.
pub const SAMPLES: &[(&str, &str)] = &[
    (
        "welcome",
        "output \"Welcome\"\nloop COUNT from 1 to 5\n  output COUNT\nend loop\n",
    ),
    (
        "input_demo",
        "\
output \"Enter something\"
VALUE = input(\"Your value:\")
output \"You entered:\", VALUE
output \"Done\"
",
    ),
    (
        "average",
        "\
// Reads numbers until an empty line, then prints their average.
SUM = 0
COUNT = 0
input N
loop while N != \"\"
  SUM = SUM + N
  COUNT = COUNT + 1
  input N
end loop
if COUNT = 0 then
  output \"No numbers entered\"
else
  output \"Average:\", SUM / COUNT
end if
",
    ),
    (
        "countdown",
        "\
input START
loop until START < 0
  output START
  START = START - 1
end loop
output \"Liftoff\"
",
    ),
];

/// Look up a sample by key.
pub fn get(name: &str) -> Option<&'static str> {
    SAMPLES
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, source)| *source)
}

/// Sample keys in menu order.
pub fn names() -> impl Iterator<Item = &'static str> {
    SAMPLES.iter().map(|(key, _)| *key)
}

/// Turn a key like `input_demo` or `inputDemo` into `Input Demo`.
pub fn display_title(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in key.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
