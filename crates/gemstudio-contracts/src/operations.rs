use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Generate,
    Edit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExamplePrompt {
    pub label: &'static str,
    pub prompt: &'static str,
}

const GENERATE_EXAMPLES: &[ExamplePrompt] = &[
    ExamplePrompt {
        label: "Mountain sunrise",
        prompt: "A serene mountain landscape at dawn with morning mist",
    },
    ExamplePrompt {
        label: "Cyberpunk street",
        prompt: "A cyberpunk street scene with neon lights and rain",
    },
    ExamplePrompt {
        label: "Robot in library",
        prompt: "A cute robot reading a book in a cozy library",
    },
    ExamplePrompt {
        label: "Magic forest",
        prompt: "A magical forest with glowing mushrooms and fairy lights",
    },
];

const EDIT_EXAMPLES: &[ExamplePrompt] = &[
    ExamplePrompt {
        label: "Snowy weather",
        prompt: "Change the weather to snowy winter with falling snow",
    },
    ExamplePrompt {
        label: "Add flowers",
        prompt: "Add colorful flowers in the foreground",
    },
    ExamplePrompt {
        label: "Vintage style",
        prompt: "Make it look like a vintage photograph from the 1950s",
    },
    ExamplePrompt {
        label: "Cartoon style",
        prompt: "Transform the scene into a cartoon animation style",
    },
];

/// Accepted upload extensions for edit sources, compared case-insensitively.
pub const SOURCE_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Edit => "edit",
        }
    }

    /// Status used when the provider returned no text alongside its result.
    pub fn success_message(self) -> &'static str {
        match self {
            Self::Generate => "Image generated successfully!",
            Self::Edit => "Image edited successfully!",
        }
    }

    pub fn error_label(self) -> &'static str {
        match self {
            Self::Generate => "Error generating image",
            Self::Edit => "Error editing image",
        }
    }

    pub fn download_file_name(self) -> &'static str {
        match self {
            Self::Generate => "generated_image.png",
            Self::Edit => "edited_image.png",
        }
    }

    pub fn default_prompt(self) -> &'static str {
        match self {
            Self::Generate => "Create a photorealistic image of people travelling in Metro train",
            Self::Edit => "Change all the people to animals wearing suits like Zootopia",
        }
    }

    /// Message shown when the caller rejects a blank prompt.
    pub fn blank_prompt_message(self) -> &'static str {
        match self {
            Self::Generate => "Please enter a description for your image.",
            Self::Edit => "Please describe how you want to edit the image.",
        }
    }

    pub fn examples(self) -> &'static [ExamplePrompt] {
        match self {
            Self::Generate => GENERATE_EXAMPLES,
            Self::Edit => EDIT_EXAMPLES,
        }
    }

    /// One-based lookup, matching how examples are numbered for users.
    pub fn example(self, number: usize) -> Option<&'static ExamplePrompt> {
        number
            .checked_sub(1)
            .and_then(|index| self.examples().get(index))
    }
}

pub fn is_supported_source_extension(extension: &str) -> bool {
    let lowered = extension.trim().to_ascii_lowercase();
    SOURCE_IMAGE_EXTENSIONS
        .iter()
        .any(|candidate| *candidate == lowered)
}
