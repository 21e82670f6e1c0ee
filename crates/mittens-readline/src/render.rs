//! Terminal output for transcript messages.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, anyhow};
use colored::Colorize;
use mittens_core::chat::{GeneratedImage, Message, MessageRole};
use mittens_core::persona;
use uuid::Uuid;

pub struct Renderer {
    image_dir: PathBuf,
}

impl Renderer {
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
        }
    }

    /// Prints a message. With `save_images`, an attached image is written to
    /// disk and its path printed; otherwise only a marker is shown.
    pub fn print_message(&self, message: &Message, save_images: bool) {
        match message.role {
            MessageRole::User => println!("{}", format!("> {}", message.text).green()),
            MessageRole::Model => {
                println!("{}", format!("[{}]", persona::NAME).bright_magenta());
                for line in message.text.lines() {
                    println!("{}", line.bright_blue());
                }
            }
        }

        let Some(url) = &message.image_url else {
            return;
        };
        if !save_images {
            println!("{}", "(image attached)".bright_black());
            return;
        }
        match self.save_image(url) {
            Ok(path) => println!("{}", format!("Image saved to {}", path.display()).yellow()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to save image");
                eprintln!("{}", format!("Failed to save image: {e:#}").red());
            }
        }
    }

    pub fn print_transcript(&self, messages: &[Message]) {
        for message in messages {
            self.print_message(message, false);
        }
    }

    /// Decodes a `data:` URL and writes it to `<image_dir>/<uuid>.<ext>`.
    pub fn save_image(&self, url: &str) -> Result<PathBuf> {
        let image =
            GeneratedImage::from_data_url(url).ok_or_else(|| anyhow!("Not an inline image"))?;
        let bytes = image.decode()?;

        fs::create_dir_all(&self.image_dir)
            .with_context(|| format!("Failed to create {}", self.image_dir.display()))?;
        let path = self
            .image_dir
            .join(format!("{}.{}", Uuid::new_v4(), image.extension()));
        fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!(path = %path.display(), "Saved image");
        Ok(path)
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }
}
