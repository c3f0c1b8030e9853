use std::collections::HashMap;

/// Declarative shape of a subcommand's arguments: named flags, named
/// value-taking options, and positional operands in order.
#[derive(Debug, Default)]
pub(crate) struct ArgSpec {
    positions: Vec<String>,
    flags: Vec<String>,
    valued: Vec<String>,
}

impl ArgSpec {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn positional(mut self, name: &str) -> Self {
        self.positions.push(name.into());
        self
    }

    pub(crate) fn flag(mut self, name: &str) -> Self {
        self.flags.push(name.into());
        self
    }

    pub(crate) fn valued(mut self, name: &str) -> Self {
        self.valued.push(name.into());
        self
    }

    pub(crate) fn parse(self, args: &[String]) -> Args {
        let mut values: HashMap<String, String> = HashMap::new();
        let mut flags: Vec<String> = Vec::new();
        let mut positional: Vec<String> = Vec::new();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if self.flags.iter().any(|f| f == arg) {
                flags.push(arg.clone());
            } else if self.valued.iter().any(|v| v == arg) {
                if let Some(value) = iter.next() {
                    values.insert(arg.clone(), value.clone());
                }
            } else {
                positional.push(arg.clone());
            }
        }

        for (name, value) in self.positions.into_iter().zip(positional) {
            values.insert(name, value);
        }

        Args { values, flags }
    }
}

#[derive(Debug)]
pub(crate) struct Args {
    values: HashMap<String, String>,
    flags: Vec<String>,
}

impl Args {
    pub(crate) fn spec() -> ArgSpec {
        ArgSpec::new()
    }

    pub(crate) fn flag(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f == name)
    }

    pub(crate) fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}
