//! Block types shipped with the editor

use crate::types::{BlockSchema, PropertyDefinition, PropertyKind, PropertyValue};

pub fn schemas() -> Vec<BlockSchema> {
    vec![heading(), paragraph(), image(), cta(), quote(), divider()]
}

fn heading() -> BlockSchema {
    BlockSchema::new("heading", "Heading")
        .with_description("Section title")
        .property(
            PropertyDefinition::new("text", PropertyKind::Text, "Heading")
                .with_label("Text")
                .required()
                .max_length(200),
        )
        .property(
            PropertyDefinition::new("level", PropertyKind::Number, 2.0)
                .with_label("Level")
                .range(1.0, 6.0)
                .integer(),
        )
        .property(
            PropertyDefinition::new("anchor", PropertyKind::Text, "")
                .with_label("Anchor")
                .max_length(64)
                .pattern("^[a-z0-9][a-z0-9-]*$"),
        )
}

fn paragraph() -> BlockSchema {
    BlockSchema::new("paragraph", "Paragraph")
        .with_description("Body copy")
        .property(
            PropertyDefinition::new("text", PropertyKind::RichText, "")
                .with_label("Text")
                .max_length(20_000),
        )
}

fn image() -> BlockSchema {
    BlockSchema::new("image", "Image")
        .with_description("Picture from the asset library")
        .property(PropertyDefinition::new("src", PropertyKind::AssetRef, PropertyValue::Null).with_label("Image"))
        .property(
            PropertyDefinition::new("alt", PropertyKind::Text, "")
                .with_label("Alt text")
                .max_length(300),
        )
        .property(
            PropertyDefinition::new("caption", PropertyKind::Text, "")
                .with_label("Caption")
                .max_length(500),
        )
        .property(
            PropertyDefinition::new("width", PropertyKind::Enum, "full")
                .with_label("Width")
                .options(["full", "wide", "inline"]),
        )
}

fn cta() -> BlockSchema {
    BlockSchema::new("cta", "Call to action")
        .with_description("Button linking elsewhere")
        .property(
            PropertyDefinition::new("label", PropertyKind::Text, "Learn more")
                .with_label("Label")
                .required()
                .max_length(80),
        )
        .property(
            PropertyDefinition::new("href", PropertyKind::Text, "/")
                .with_label("Link")
                .required()
                .pattern("^(https?://|/|mailto:)"),
        )
        .property(
            PropertyDefinition::new("variant", PropertyKind::Enum, "primary")
                .with_label("Style")
                .options(["primary", "secondary", "link"]),
        )
        .property(PropertyDefinition::new("openInNewTab", PropertyKind::Boolean, false).with_label("Open in new tab"))
}

fn quote() -> BlockSchema {
    BlockSchema::new("quote", "Quote")
        .with_description("Pull quote with attribution")
        .property(
            PropertyDefinition::new("text", PropertyKind::RichText, "")
                .with_label("Quote")
                .max_length(2_000),
        )
        .property(
            PropertyDefinition::new("attribution", PropertyKind::Text, "")
                .with_label("Attribution")
                .max_length(120),
        )
}

fn divider() -> BlockSchema {
    BlockSchema::new("divider", "Divider")
        .with_description("Horizontal rule between sections")
        .property(
            PropertyDefinition::new("spacing", PropertyKind::Enum, "medium")
                .with_label("Spacing")
                .options(["small", "medium", "large"]),
        )
}
