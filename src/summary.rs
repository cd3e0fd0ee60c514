use faderlink::Bridge;

/// Styling for the `check` summary. Plain text when stdout is not a terminal.
struct Palette {
    color: bool,
}

impl Palette {
    fn style(&self, sgr: &str, text: impl AsRef<str>) -> String {
        if self.color { format!("\x1b[{sgr}m{}\x1b[0m", text.as_ref()) } else { text.as_ref().to_string() }
    }

    fn ok(&self, text: impl AsRef<str>) -> String {
        self.style("1;32", text)
    }

    fn section(&self, title: &str) -> String {
        self.style("90", format!("━━━ {title} ━━━"))
    }

    fn value(&self, text: impl AsRef<str>) -> String {
        self.style("36", text)
    }

    fn warn(&self, text: impl AsRef<str>) -> String {
        self.style("33", text)
    }

    fn name(&self, text: impl AsRef<str>) -> String {
        self.style("1", text)
    }

    fn muted(&self, text: impl AsRef<str>) -> String {
        self.style("2", text)
    }
}

/// Print what a configuration compiled to.
pub fn print_check(source: &str, bridge: &Bridge, color: bool) {
    let palette = Palette { color };
    println!("\n{}", palette.ok(format!("✔  Configuration OK: {source}")));

    println!("\n{}", palette.section("Endpoints"));
    match bridge.endpoint() {
        Some(endpoint) => println!("  send    {}", palette.value(endpoint.to_string())),
        None => println!("  send    {}", palette.warn("not set (automation output is dropped)")),
    }
    println!("  listen  {}", palette.value(bridge.listen().to_string()));
    for (surface, peer) in bridge.peers() {
        println!("  {}  {}", surface, palette.value(peer.to_string()));
    }

    println!("\n{}", palette.section("Rule tables"));
    for (surface, rules) in bridge.tables().iter() {
        println!("  {} {}", palette.name(surface), palette.muted(format!("({} rules)", rules.len())));
        for rule in rules {
            let mut parts = Vec::new();
            if let Some(from) = &rule.from {
                parts.push(from.address.clone());
            }
            if let Some(to) = &rule.to {
                parts.push(to.address.clone());
            }
            let arrow = parts.join(" ⇄ ");
            let sets = if rule.mutations.is_empty() {
                String::new()
            } else {
                let names: Vec<&str> = rule.mutations.iter().map(|(name, _)| name.as_str()).collect();
                palette.warn(format!("  sets {}", names.join(", ")))
            };
            println!("    {:<32} {}{}", rule.label, palette.muted(arrow), sets);
        }
    }

    let env = bridge.environment();
    println!("\n{}", palette.section("Environment"));
    for (name, value) in env.constants().iter() {
        println!("  {} = {}", palette.muted(name), value);
    }
    for (name, value) in env.variables() {
        println!("  {} = {}", palette.name(name), palette.value(value.to_string()));
    }

    println!("\n{}", palette.section("Handshake"));
    println!("  {}", bridge.handshake().message);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_output_has_no_escape_codes() {
        let palette = Palette { color: false };
        assert_eq!(palette.section("Endpoints"), "━━━ Endpoints ━━━");
        assert_eq!(palette.warn("not set"), "not set");
    }

    #[test]
    fn colored_output_wraps_in_sgr() {
        let palette = Palette { color: true };
        assert_eq!(palette.value("127.0.0.1:3819"), "\x1b[36m127.0.0.1:3819\x1b[0m");
        assert_eq!(palette.ok("OK"), "\x1b[1;32mOK\x1b[0m");
    }
}
