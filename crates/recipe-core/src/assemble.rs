//! Building recipes out of classified lines.

use std::sync::Arc;

use image::DynamicImage;

use crate::error::{AssemblyError, PipelineError};
use crate::store::{Recipe, StoreHandle};
use crate::types::{ClassifiedLine, Label};

/// Split classified lines into `(ingredients, instructions)`, keeping order.
/// Unknown lines are dropped.
pub fn partition(lines: &[ClassifiedLine]) -> (Vec<String>, Vec<String>) {
    let mut ingredients = Vec::new();
    let mut instructions = Vec::new();

    for classified in lines {
        match classified.label {
            Label::Ingredient => ingredients.push(classified.line.clone()),
            Label::Instruction => instructions.push(classified.line.clone()),
            Label::Unknown => {}
        }
    }

    (ingredients, instructions)
}

/// Build a recipe. Fails if there is no image to attach.
pub fn assemble(
    lines: &[ClassifiedLine],
    image: Option<Arc<DynamicImage>>,
    category: &str,
) -> Result<Recipe, AssemblyError> {
    let image = image.ok_or(AssemblyError::MissingImage)?;
    let (ingredients, instructions) = partition(lines);
    Ok(Recipe::new(category, image, ingredients, instructions))
}

/// Assemble a recipe and append it to the store.
///
/// The store is not touched unless assembly succeeds.
pub async fn save(
    store: &StoreHandle,
    lines: &[ClassifiedLine],
    image: Option<Arc<DynamicImage>>,
    category: &str,
) -> Result<Recipe, PipelineError> {
    let recipe = assemble(lines, image, category)?;
    store.add_recipe(recipe.clone()).await?;
    Ok(recipe)
}
