//! Material resource: one shader plus fixed texture slots and properties
//!
//! A material holds exactly one shader reference (a handle into the owning
//! [`super::ShaderCatalog`]) and a slot array whose size is fixed at
//! construction. Slot indices map 1:1 to the fixed sampler names and units in
//! [`crate::render::binding`]; the material never invents unit numbers of its
//! own. Textures are referenced by handle into the owning registry, never
//! owned here.

use super::shader::{Shader, ShaderHandle};
use super::texture::Texture;
use crate::foundation::math::Vec4;
use crate::gpu::GraphicsDevice;
use crate::render::binding::MaterialSlot;

/// Handle into the scene manager's texture registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub usize);

/// A renderable surface description
#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    shader: ShaderHandle,
    slots: Vec<Option<TextureHandle>>,
    vec4_properties: Vec<(String, Vec4)>,
    scalar_properties: Vec<(String, f32)>,
}

impl Material {
    /// Create a material with `texture_count` empty texture slots
    pub fn new(name: impl Into<String>, shader: ShaderHandle, texture_count: usize) -> Self {
        Self {
            name: name.into(),
            shader,
            slots: vec![None; texture_count],
            vec4_properties: Vec::new(),
            scalar_properties: Vec::new(),
        }
    }

    /// Create a material with the standard slot layout
    pub fn standard(name: impl Into<String>, shader: ShaderHandle) -> Self {
        Self::new(name, shader, MaterialSlot::COUNT)
    }

    /// Material name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle of the single shader this material renders with
    pub fn shader(&self) -> ShaderHandle {
        self.shader
    }

    /// Number of texture slots fixed at construction
    pub fn texture_count(&self) -> usize {
        self.slots.len()
    }

    /// Assign a texture handle to a slot; out-of-range slots are logged and
    /// ignored
    pub fn set_texture(&mut self, slot: MaterialSlot, texture: TextureHandle) {
        match self.slots.get_mut(slot.index()) {
            Some(entry) => *entry = Some(texture),
            None => log::warn!(
                "material '{}' has no slot {:?} (slot count {})",
                self.name,
                slot,
                self.slots.len()
            ),
        }
    }

    /// Texture handle occupying a slot, if any
    pub fn texture(&self, slot: MaterialSlot) -> Option<TextureHandle> {
        self.slots.get(slot.index()).copied().flatten()
    }

    /// Record a named vec4 shader property
    pub fn set_vec4_property(&mut self, name: impl Into<String>, value: Vec4) {
        let name = name.into();
        if let Some(entry) = self.vec4_properties.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.vec4_properties.push((name, value));
        }
    }

    /// Record a named scalar shader property
    pub fn set_scalar_property(&mut self, name: impl Into<String>, value: f32) {
        let name = name.into();
        if let Some(entry) = self.scalar_properties.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.scalar_properties.push((name, value));
        }
    }

    /// Named vec4 property lookup
    pub fn vec4_property(&self, name: &str) -> Option<Vec4> {
        self.vec4_properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Named scalar property lookup
    pub fn scalar_property(&self, name: &str) -> Option<f32> {
        self.scalar_properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Bind every occupied texture slot at its contractual unit
    ///
    /// Empty slots perform no bind at all; the shader's sampler uniforms keep
    /// their previously configured unit numbers.
    pub fn bind_all_textures(&self, device: &mut dyn GraphicsDevice, textures: &[Texture]) {
        for slot in MaterialSlot::ALL {
            let Some(handle) = self.texture(slot) else {
                continue;
            };
            match textures.get(handle.0) {
                Some(texture) => texture.bind(device, slot.unit(), true),
                None => log::warn!(
                    "material '{}' references texture handle {} outside the registry",
                    self.name,
                    handle.0
                ),
            }
        }
    }

    /// Detach every occupied texture slot
    pub fn unbind_all_textures(&self, device: &mut dyn GraphicsDevice, textures: &[Texture]) {
        for slot in MaterialSlot::ALL {
            let Some(handle) = self.texture(slot) else {
                continue;
            };
            if let Some(texture) = textures.get(handle.0) {
                texture.bind(device, slot.unit(), false);
            }
        }
    }

    /// Upload the recorded properties as uniforms on the bound shader
    pub fn upload_properties(&self, device: &mut dyn GraphicsDevice, shader: &mut Shader) {
        for (name, value) in &self.vec4_properties {
            shader.set_vec4(device, name, value);
        }
        for (name, value) in &self.scalar_properties {
            shader.set_f32(device, name, *value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingDevice;

    #[test]
    fn test_empty_slots_bind_nothing() {
        let mut device = RecordingDevice::new();
        let material = Material::new("bare", ShaderHandle(0), 4);
        let textures: Vec<Texture> = Vec::new();

        material.bind_all_textures(&mut device, &textures);
        assert_eq!(device.count_calls_containing("bind_texture"), 0);
    }

    #[test]
    fn test_occupied_slot_binds_at_contract_unit() {
        let mut device = RecordingDevice::new();
        let mut albedo = Texture::solid("white", [255, 255, 255, 255]);
        albedo.buffer(&mut device).unwrap();
        let textures = vec![albedo];

        let mut material = Material::standard("painted", ShaderHandle(0));
        material.set_texture(MaterialSlot::Albedo, TextureHandle(0));

        material.bind_all_textures(&mut device, &textures);
        assert_eq!(device.count_calls_containing("bind_texture unit=0"), 1);
        // Other slots untouched
        assert_eq!(device.count_calls_containing("bind_texture unit=1"), 0);
    }

    #[test]
    fn test_out_of_registry_handle_is_skipped() {
        let mut device = RecordingDevice::new();
        let mut material = Material::standard("broken", ShaderHandle(0));
        material.set_texture(MaterialSlot::Normal, TextureHandle(42));

        let textures: Vec<Texture> = Vec::new();
        material.bind_all_textures(&mut device, &textures);
        assert_eq!(device.count_calls_containing("bind_texture"), 0);
    }

    #[test]
    fn test_properties_overwrite_by_name() {
        let mut material = Material::standard("m", ShaderHandle(0));
        material.set_scalar_property("roughness", 0.2);
        material.set_scalar_property("roughness", 0.8);
        assert_eq!(material.scalar_property("roughness"), Some(0.8));
    }

    #[test]
    fn test_slot_out_of_range_ignored() {
        let mut material = Material::new("tiny", ShaderHandle(0), 1);
        material.set_texture(MaterialSlot::Surface, TextureHandle(0));
        assert_eq!(material.texture(MaterialSlot::Surface), None);
    }
}
