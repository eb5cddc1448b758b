use crate::browser;
use crate::collab::Surface;
use crate::engine::Size;
use crate::sprite::Background;
use crate::transform::NodeId;
use anyhow::{anyhow, Result};
use web_sys::HtmlElement;

/// [`Surface`] over absolutely positioned divs inside one layer element
pub struct DomSurface {
    layer_id: String,
}

impl DomSurface {
    pub fn new(layer_id: &str) -> Result<Self> {
        // fail early if the layer is not in the page
        browser::element(layer_id)?;
        Ok(DomSurface {
            layer_id: layer_id.to_string(),
        })
    }

    fn node(&self, node: NodeId) -> Result<HtmlElement> {
        browser::html_element(&node.dom_id())
    }

    fn set_style(&self, node: NodeId, property: &str, value: &str) -> Result<()> {
        self.node(node)?
            .style()
            .set_property(property, value)
            .map_err(|err| anyhow!("Could not set {} on {} : {:#?}", property, node.dom_id(), err))
    }
}

impl Surface for DomSurface {
    fn create_node(&mut self, node: NodeId) -> Result<()> {
        let id = node.dom_id();
        if browser::element(&id).is_ok() {
            return Ok(());
        }
        let element = browser::create_element("div")?;
        element.set_id(&id);
        element.set_class_name(&node.class_name());
        browser::element(&self.layer_id)?
            .append_child(&element)
            .map_err(|err| anyhow!("Could not attach {} : {:#?}", id, err))?;
        Ok(())
    }

    fn remove_node(&mut self, node: NodeId) -> Result<()> {
        browser::element(&node.dom_id())?.remove();
        Ok(())
    }

    fn set_transform(&mut self, node: NodeId, css: &str) -> Result<()> {
        self.set_style(node, "transform", css)
    }

    fn set_background(&mut self, node: NodeId, background: &Background) -> Result<()> {
        let element = self.node(node)?;
        element
            .set_attribute("data-sheet", background.sheet.name())
            .map_err(|err| anyhow!("Could not set sheet on {} : {:#?}", node.dom_id(), err))?;
        self.set_style(node, "background-position", &background.css_position())
    }

    fn set_size(&mut self, node: NodeId, size: Size) -> Result<()> {
        self.set_style(node, "width", &format!("{}px", size.width))?;
        self.set_style(node, "height", &format!("{}px", size.height))
    }

    fn attach_beside(&mut self, node: NodeId, anchor_id: &str) -> Result<()> {
        let element = self.node(node)?;
        let anchor = browser::element(anchor_id)?;
        let parent = anchor
            .parent_node()
            .ok_or_else(|| anyhow!("{} has no parent to share", anchor_id))?;
        parent
            .insert_before(&element, anchor.next_sibling().as_ref())
            .map_err(|err| anyhow!("Could not move {} beside {} : {:#?}", node.dom_id(), anchor_id, err))?;
        Ok(())
    }

    fn attach_to_layer(&mut self, node: NodeId) -> Result<()> {
        let element = self.node(node)?;
        browser::element(&self.layer_id)?
            .append_child(&element)
            .map_err(|err| anyhow!("Could not return {} to its layer : {:#?}", node.dom_id(), err))?;
        Ok(())
    }

    fn set_stack_index(&mut self, node: NodeId, index: Option<i32>) -> Result<()> {
        match index {
            Some(index) => self.set_style(node, "z-index", &index.to_string()),
            None => self
                .node(node)?
                .style()
                .remove_property("z-index")
                .map(|_| ())
                .map_err(|err| anyhow!("Could not clear z-index on {} : {:#?}", node.dom_id(), err)),
        }
    }
}
