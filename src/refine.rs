//! Refinement requests for generated images.
//!
//! A refinement is a free-text instruction plus optional reference art,
//! replacement art and a selected region. The region crop is rasterized
//! locally so the image model sees exactly what the user boxed.

use serde::{Deserialize, Serialize};
use sitecraft_common::SelectionRegion;

use crate::errors::{RefineError, RegionError};
use crate::region;

/// Wire payload for an image refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementPayload {
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<SelectionRegion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_crop_image_url: Option<String>,
}

/// Ordered image inputs and text prompt for the image model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedPrompt {
    pub image_urls: Vec<String>,
    pub prompt: String,
}

impl RefinementPayload {
    /// Validate and normalize a payload. Blank optional urls count as absent.
    pub fn build(
        instruction: &str,
        reference_image_url: Option<String>,
        replacement_image_url: Option<String>,
        region: Option<SelectionRegion>,
        region_crop_image_url: Option<String>,
    ) -> Result<Self, RefineError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(RefineError::EmptyInstruction);
        }
        let region = region.map(SelectionRegion::validated).transpose().map_err(RegionError::from)?;
        Ok(Self {
            instruction: instruction.to_string(),
            reference_image_url: non_blank(reference_image_url),
            replacement_image_url: non_blank(replacement_image_url),
            region,
            region_crop_image_url: non_blank(region_crop_image_url),
        })
    }

    /// Re-run `build` on a payload that came off the wire.
    pub fn validated(self) -> Result<Self, RefineError> {
        Self::build(
            &self.instruction,
            self.reference_image_url,
            self.replacement_image_url,
            self.region,
            self.region_crop_image_url,
        )
    }

    /// Crop `source` to the selected region and attach it as a data URL.
    ///
    /// A no-op without a region or when a crop is already attached.
    pub async fn attach_region_crop(&mut self, source: &str) -> Result<(), RegionError> {
        let Some(region) = self.region else {
            return Ok(());
        };
        if self.region_crop_image_url.is_some() {
            return Ok(());
        }
        let png = region::fetch_and_crop(source, &region).await?;
        tracing::debug!(bytes = png.len(), "attached region crop");
        self.region_crop_image_url = Some(region::png_data_url(&png));
        Ok(())
    }
}

fn non_blank(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

/// Choose image inputs and wording for the refinement of `source_url`.
pub fn compose_prompt(payload: &RefinementPayload, source_url: &str) -> ComposedPrompt {
    let instruction = payload.instruction.trim();
    let mut image_urls = vec![source_url.to_string()];

    let prompt = match (
        payload.reference_image_url.as_deref(),
        payload.replacement_image_url.as_deref(),
        payload.region_crop_image_url.as_deref(),
    ) {
        (Some(reference), None, _) => {
            image_urls.push(reference.to_string());
            format!(
                "Apply the visual style of the second image (the reference) to the first image. \
                 Keep the composition and subject of the first image. Additional instruction: {}",
                instruction
            )
        }
        (_, Some(replacement), Some(crop)) => {
            image_urls.push(crop.to_string());
            image_urls.push(replacement.to_string());
            format!(
                "In the first image, replace the area shown in the second image (the selected crop) \
                 with the content of the third image. Leave the rest of the first image unchanged. {}",
                instruction
            )
        }
        (_, Some(replacement), None) => {
            image_urls.push(replacement.to_string());
            format!(
                "In the first image, replace the element or area described below with the content \
                 of the second image. Leave the rest unchanged. Instruction: {}",
                instruction
            )
        }
        (None, None, _) => format!(
            "Apply this change to the image, keep the rest the same: {}",
            instruction
        ),
    };

    ComposedPrompt { image_urls, prompt }
}
