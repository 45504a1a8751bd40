//! The program the host runs at startup

/// Script source baked into the binary.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Program {
    pub name: &'static str,
    pub source: &'static str,
}

/// Greets, prints the local time as `YYYY-MM-DD HH:MM:SS`, then `uname()`.
///
/// Relies on the `echo`, `EOL` and `uname` globals of the QuickJS backend.
pub const EMBEDDED_PROGRAM: Program = Program {
    name: "startup",
    source: r#"
        function pad(n) {
            return (n < 10 ? '0' : '') + n;
        }

        function timestamp(d) {
            return d.getFullYear() + '-' + pad(d.getMonth() + 1) + '-' + pad(d.getDate()) +
                ' ' + pad(d.getHours()) + ':' + pad(d.getMinutes()) + ':' + pad(d.getSeconds());
        }

        echo('Welcome to embedhost' + EOL);
        echo('Current system time is: ' + timestamp(new Date()) + EOL);
        echo('and you are running ' + uname());
    "#,
};
