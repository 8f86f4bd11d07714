#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands whose whole remainder is a prompt.
pub(crate) const PROMPT_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "generate",
        action: "generate",
    },
    CommandSpec {
        command: "edit",
        action: "edit",
    },
];

/// Commands taking a one-based example number.
pub(crate) const EXAMPLE_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "example",
        action: "generate_example",
    },
    CommandSpec {
        command: "edit_example",
        action: "edit_example",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "use",
        action: "set_source_image",
    },
    CommandSpec {
        command: "out",
        action: "set_out_dir",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "examples",
        action: "list_examples",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/generate <prompt>",
    "/use <image>",
    "/edit <prompt>",
    "/examples",
    "/example <n>",
    "/edit_example <n>",
    "/out <dir>",
    "/help",
    "/quit",
];
